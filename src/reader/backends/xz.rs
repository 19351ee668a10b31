//! xz backend, wrapping `liblzma`'s streaming reader. Unlike the zstd
//! container format, xz carries no frame content-size field, so this
//! backend always reports `content_size() == None`.

use std::io::Read;

use liblzma::read::XzDecoder;

use crate::error::Result;
use crate::reader::{Backend, Erased};

pub struct XzBackend {
    dec: XzDecoder<Erased>,
}

impl XzBackend {
    pub fn open(ar: Erased) -> Self {
        XzBackend { dec: XzDecoder::new(ar) }
    }

    pub fn into_inner(self) -> Erased {
        self.dec.into_inner()
    }
}

impl Backend for XzBackend {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.dec.read(buf)?)
    }

    fn content_size(&self) -> Option<u64> {
        None
    }
}
