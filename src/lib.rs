//! zpkglist — a codec for package-list files: concatenated RPM header blobs,
//! and the "zpkglist" container that compresses them against a shared,
//! compile-time dictionary.
//!
//! Ported from the `zpkglist`/`rpmio` sources (`compress.c`, `zreader.c`,
//! `areader.c`, `header.c`, `op-zpkglist.c`) on top of this crate's own
//! pure-Rust LZ4 block engine (`block`).

pub mod areader;
pub mod block;
pub mod cli;
pub mod config;
pub mod container;
pub mod dict;
pub mod error;
pub mod header;
pub mod reader;
pub mod xxhash;

pub use container::compress;
pub use container::{Envelope, FramePos};
pub use error::{Result, ZpkglistError};
pub use reader::Reader;
