//! Error model for the zpkglist codec.
//!
//! Mirrors the `err[2]` convention of the original C library (`error.h`) as
//! a plain Rust enum: `Display` + `std::error::Error`, no handle to free,
//! no distinct "allocation failure" variant (the global allocator aborts
//! the process on OOM instead of returning one).

use core::fmt;

/// Everything that can go wrong reading or writing a zpkglist container.
#[derive(Debug)]
pub enum ZpkglistError {
    /// Underlying I/O failure (read/write/seek on the caller's stream).
    Io(std::io::Error),
    /// A read returned fewer bytes than a structure required, with no more
    /// data following. Distinct from `Io` so callers can tell "truncated
    /// file" from "disk error".
    UnexpectedEof,
    /// A magic number didn't match any known format. The payload names
    /// which check failed.
    BadMagic(&'static str),
    /// A declared size field was out of bounds for its context (header
    /// `il`/`dl`, frame content size, envelope sizes, ...).
    BadSize(&'static str),
    /// The LZ4 (or external backend) decoder rejected its input as
    /// malformed.
    Decompression(&'static str),
    /// Caller misused the API: wrote to a non-seekable/non-regular output,
    /// asked for an unsupported CLI feature, etc.
    Usage(&'static str),
}

impl fmt::Display for ZpkglistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZpkglistError::Io(e) => write!(f, "I/O error: {e}"),
            ZpkglistError::UnexpectedEof => f.write_str("unexpected end of file"),
            ZpkglistError::BadMagic(what) => write!(f, "bad magic number: {what}"),
            ZpkglistError::BadSize(what) => write!(f, "bad size: {what}"),
            ZpkglistError::Decompression(what) => write!(f, "decompression failed: {what}"),
            ZpkglistError::Usage(what) => write!(f, "usage error: {what}"),
        }
    }
}

impl std::error::Error for ZpkglistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZpkglistError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ZpkglistError {
    fn from(e: std::io::Error) -> Self {
        ZpkglistError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, ZpkglistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_mention_kind() {
        assert!(ZpkglistError::UnexpectedEof.to_string().contains("end of file"));
        assert!(ZpkglistError::BadMagic("envelope").to_string().contains("envelope"));
        assert!(ZpkglistError::BadSize("il").to_string().contains("il"));
        assert!(ZpkglistError::Decompression("corrupt block")
            .to_string()
            .contains("corrupt block"));
        assert!(ZpkglistError::Usage("output not seekable")
            .to_string()
            .contains("output not seekable"));
    }

    #[test]
    fn io_error_round_trips_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ZpkglistError = io_err.into();
        assert!(matches!(err, ZpkglistError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
