//! Thin CLI host for the VoxStream streaming transcription scheduler.
//!
//! Loads one or two whisper.cpp models, wires up an audio source (a WAV file
//! or the default microphone), and drives [`voxstream_stt::Controller`] until
//! the stream completes or the user hits Ctrl-C. The scheduler itself — ring
//! buffer, VAD-aligned chunking, dual-worker parallelism, context hand-off —
//! lives entirely in `voxstream-stt`; this binary only wires it to a terminal.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use voxstream_app::foundation::ShutdownHandler;
use voxstream_foundation::error::LoadError;
use voxstream_stt::{Controller, Language, StreamConfig, StreamEvent, StreamProfile, VadSource};
use voxstream_stt_whisper::WhisperModelSource;

mod mic_source;

#[derive(Parser, Debug)]
#[command(name = "voxstream", about = "Chunked streaming transcription demo")]
struct Cli {
    /// Path to a ggml whisper model for slot 0.
    #[arg(long)]
    model: PathBuf,

    /// Optional second model for dual-worker ping-pong parallelism (slot 1).
    #[arg(long)]
    model2: Option<PathBuf>,

    /// Input WAV file (mono, 16kHz). Omit to capture from the default microphone.
    #[arg(long)]
    input: Option<PathBuf>,

    /// BCP-47 language tag; omitted means auto-detect.
    #[arg(long)]
    language: Option<String>,

    #[arg(long, default_value_t = false)]
    translate: bool,

    #[arg(long, default_value_t = 4)]
    threads: u32,

    #[arg(long, value_enum, default_value_t = ProfileArg::Default)]
    profile: ProfileArg,

    #[arg(long, default_value_t = false)]
    gpu: bool,

    /// Disable Silero VAD; chunk boundaries fall back to fixed-duration cuts.
    #[arg(long, default_value_t = false)]
    no_vad: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ProfileArg {
    Default,
    Live,
    HostFile,
}

impl From<ProfileArg> for StreamProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Default => StreamProfile::Default,
            ProfileArg::Live => StreamProfile::Live,
            ProfileArg::HostFile => StreamProfile::HostFile,
        }
    }
}

#[cfg(feature = "silero")]
struct SileroVadSource;

#[cfg(feature = "silero")]
impl VadSource for SileroVadSource {
    fn load(&self) -> Result<Box<dyn voxstream_vad::VoiceActivityModel>, LoadError> {
        voxstream_vad_silero::SileroVad::new(voxstream_vad_silero::SileroConfig::default())
            .map(|vad| Box::new(vad) as Box<dyn voxstream_vad::VoiceActivityModel>)
            .map_err(LoadError::InvalidModel)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let (events_tx, events_rx) = mpsc::channel::<StreamEvent>();
    let controller = Arc::new(Controller::new(events_tx));

    controller.load_model(
        0,
        Box::new(WhisperModelSource::new(&cli.model)),
        vad_source_for(cli.no_vad),
        cli.gpu,
    );

    if let Some(model2) = &cli.model2 {
        controller.load_model(
            1,
            Box::new(WhisperModelSource::new(model2)),
            vad_source_for(cli.no_vad),
            cli.gpu,
        );
    }

    let shutdown = ShutdownHandler::new().install().await;
    let stop_controller = Arc::clone(&controller);
    tokio::spawn(async move {
        shutdown.wait().await;
        tracing::info!("stop requested, signalling the stream");
        stop_controller.stop();
    });

    let language = match &cli.language {
        Some(tag) => Language::Tag(tag.clone()),
        None => Language::Auto,
    };
    let cfg = StreamConfig::for_profile(cli.profile.into());

    let source: Box<dyn voxstream_audio::AudioSource> = match &cli.input {
        Some(path) => {
            if let Ok(reader) = hound::WavReader::open(path) {
                let spec = reader.spec();
                let duration_ms = (reader.duration() as u64 * 1000) / spec.sample_rate.max(1) as u64;
                controller.set_duration(duration_ms);
            }
            Box::new(voxstream_audio::WavFileSource::open(path)?)
        }
        None => {
            tracing::info!("no --input given, capturing from the default microphone");
            Box::new(mic_source::MicSource::default_device()?)
        }
    };

    controller.start(cfg, cli.threads, language, cli.translate, source);

    let drain = tokio::task::spawn_blocking(move || {
        while let Ok(event) = events_rx.recv() {
            match event {
                StreamEvent::Loaded { slot, gpu_description } => {
                    println!("slot {slot} loaded (gpu: {gpu_description:?})");
                }
                StreamEvent::Progress { percent } => {
                    println!("progress: {percent}%");
                }
                StreamEvent::NewSegment { text, t0_ms, t1_ms, language_tag } => {
                    println!("[{t0_ms}-{t1_ms}ms] ({language_tag:?}) {text}");
                }
                StreamEvent::StreamComplete { success } => {
                    println!("stream complete: success={success}");
                    break;
                }
                StreamEvent::Error { message } => {
                    eprintln!("error: {message}");
                }
            }
        }
    });

    drain.await?;
    Ok(())
}

#[cfg(feature = "silero")]
fn vad_source_for(no_vad: bool) -> Option<Box<dyn VadSource>> {
    if no_vad {
        None
    } else {
        Some(Box::new(SileroVadSource))
    }
}

#[cfg(not(feature = "silero"))]
fn vad_source_for(_no_vad: bool) -> Option<Box<dyn VadSource>> {
    None
}
