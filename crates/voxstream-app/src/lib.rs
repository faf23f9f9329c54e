//! Demo binary support: process lifecycle plumbing shared with `main.rs`.
//! The streaming scheduler itself lives entirely in `voxstream-stt` and its
//! collaborator crates; this crate only wires them together for a CLI.

pub mod foundation;
