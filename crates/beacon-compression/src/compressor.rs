//! Maximum-quality body compression

use crate::encoding::ContentEncoding;
use brotli::enc::backward_references::BrotliEncoderMode;
use brotli::enc::BrotliEncoderParams;
use bytes::Bytes;
use std::io::{self, Write};

/// Gzip level (maximum)
pub const GZIP_LEVEL: u32 = 9;

/// Deflate level (maximum)
pub const DEFLATE_LEVEL: u32 = 9;

/// Brotli quality (maximum)
pub const BROTLI_QUALITY: i32 = 11;

/// Brotli window size (log2)
pub const BROTLI_WINDOW: i32 = 22;

/// Brotli size hint; 0 means unknown
pub const BROTLI_SIZE_HINT: usize = 0;

/// Sink for encoder output that keeps every write as its own chunk
#[derive(Debug, Default)]
struct ChunkWriter {
    chunks: Vec<Bytes>,
}

impl Write for ChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !buf.is_empty() {
            self.chunks.push(Bytes::copy_from_slice(buf));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One-shot compression stream bound to a single encoding
///
/// Consumes the whole input at once and yields the encoder's output in the
/// chunks the encoder produced them.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    encoding: ContentEncoding,
}

impl Compressor {
    /// Create a compressor for `encoding`
    pub fn new(encoding: ContentEncoding) -> Self {
        Self { encoding }
    }

    /// The encoding this compressor produces
    pub fn encoding(&self) -> ContentEncoding {
        self.encoding
    }

    /// Compress `input` as a single unit
    pub fn compress(self, input: &[u8]) -> io::Result<Vec<Bytes>> {
        let mut out = ChunkWriter::default();
        match self.encoding {
            ContentEncoding::Brotli => {
                brotli::BrotliCompress(&mut io::Cursor::new(input), &mut out, &brotli_params())?;
            }
            ContentEncoding::Gzip => {
                use flate2::write::GzEncoder;
                use flate2::Compression;

                let mut encoder = GzEncoder::new(out, Compression::new(GZIP_LEVEL));
                encoder.write_all(input)?;
                out = encoder.finish()?;
            }
            ContentEncoding::Deflate => {
                use flate2::write::ZlibEncoder;
                use flate2::Compression;

                let mut encoder = ZlibEncoder::new(out, Compression::new(DEFLATE_LEVEL));
                encoder.write_all(input)?;
                out = encoder.finish()?;
            }
        }
        Ok(out.chunks)
    }

    /// Compress `input` into one contiguous buffer
    pub fn compress_to_vec(self, input: &[u8]) -> io::Result<Vec<u8>> {
        Ok(self.compress(input)?.concat())
    }
}

fn brotli_params() -> BrotliEncoderParams {
    BrotliEncoderParams {
        quality: BROTLI_QUALITY,
        lgwin: BROTLI_WINDOW,
        mode: BrotliEncoderMode::BROTLI_MODE_TEXT,
        size_hint: BROTLI_SIZE_HINT,
        ..Default::default()
    }
}
