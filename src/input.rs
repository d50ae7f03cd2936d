//! Dump file input with transparent decompression.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression from the file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    fn wrap<'a>(&self, reader: impl Read + 'a) -> std::io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Xz => "xz",
            Compression::Zstd => "zstd",
        };
        f.write_str(name)
    }
}

/// Read a whole dump file into memory as UTF-8 text
pub fn read_dump(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("Cannot open dump file: {}", path.display()))?;
    let compression = Compression::from_path(path);

    let mut reader = compression
        .wrap(BufReader::with_capacity(256 * 1024, file))
        .with_context(|| format!("Cannot initialize {} decoder", compression))?;

    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .with_context(|| format!("Cannot read dump file as UTF-8: {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        %compression,
        bytes = text.len(),
        "read dump"
    );
    Ok(text)
}
