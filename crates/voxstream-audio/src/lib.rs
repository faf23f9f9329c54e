pub mod boundary;
pub mod chunker;
pub mod constants;
pub mod ring_buffer;
pub mod source;

pub use boundary::{vad_window, Boundary};
pub use chunker::{ChunkDescriptor, Chunker, ChunkerConfig, PreparedChunk};
pub use constants::{SAMPLE_RATE_HZ, VAD_LOOKAHEAD_MARGIN_SAMPLES};
pub use ring_buffer::RingBuffer;
pub use source::{AudioSource, SliceSource, WavFileSource};
