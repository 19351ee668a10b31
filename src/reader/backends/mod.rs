pub mod raw;
pub mod xz;
pub mod zstd;

pub use raw::RawBackend;
pub use xz::XzBackend;
pub use zstd::ZstdBackend;
