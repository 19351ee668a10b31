//! zstd backend, wrapping the `zstd` crate's streaming decoder. Grounded on
//! `zstd::stream::read::Decoder`'s `with_buffer`/`finish` pair, which lets
//! this backend hand its `Erased` reader straight through without an extra
//! `BufReader` layer and reclaim it unchanged once the frame is exhausted.

use std::io::BufRead;

use zstd::stream::read::Decoder;

use crate::error::{Result, ZpkglistError};
use crate::reader::{Backend, Erased};

pub struct ZstdBackend {
    dec: Decoder<'static, Erased>,
    content_size: Option<u64>,
}

impl ZstdBackend {
    pub fn open(mut ar: Erased) -> Result<Self> {
        let content_size = {
            let peeked = ar.fill_buf()?;
            zstd_safe::get_frame_content_size(peeked)
                .ok()
                .flatten()
        };
        let dec = Decoder::with_buffer(ar)
            .map_err(|_| ZpkglistError::Decompression("cannot open zstd frame"))?;
        Ok(ZstdBackend { dec, content_size })
    }

    pub fn into_inner(self) -> Erased {
        self.dec.finish()
    }
}

impl Backend for ZstdBackend {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        use std::io::Read;
        Ok(self.dec.read(buf)?)
    }

    fn content_size(&self) -> Option<u64> {
        self.content_size
    }
}
