//! Pass-through backend for concatenated raw RPM header blobs (no outer
//! compression at all). Ported from the raw-passthrough half of the
//! dispatcher described in `areader.c`.

use crate::areader::AReader;
use crate::error::Result;
use crate::reader::{Backend, Erased};

pub struct RawBackend {
    ar: AReader<Erased>,
}

impl RawBackend {
    pub fn new(ar: AReader<Erased>) -> Self {
        RawBackend { ar }
    }

    pub fn into_inner(self) -> Erased {
        Box::new(self.ar)
    }
}

impl Backend for RawBackend {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.ar.read(buf)?)
    }

    fn content_size(&self) -> Option<u64> {
        None
    }
}
