//! Streams a file manifest into a single zip archive.

use super::progress::ProgressCounter;
use crate::config::{ArchiveConfig, Compression};
use crate::fs::walker::Manifest;
use crate::utils::Result;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Entries at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Copy buffer size in bytes
    pub chunk_size: usize,
    pub compression: Compression,
    pub compression_level: Option<i64>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::from(&ArchiveConfig::default())
    }
}

impl From<&ArchiveConfig> for ArchiveOptions {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            compression: config.compression,
            compression_level: config.compression_level,
        }
    }
}

impl ArchiveOptions {
    fn file_options(&self, size: u64) -> SimpleFileOptions {
        let options = SimpleFileOptions::default().large_file(size >= ZIP64_THRESHOLD);
        match self.compression {
            Compression::Deflate => options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(self.compression_level),
            Compression::Stored => options.compression_method(CompressionMethod::Stored),
        }
    }
}

/// Totals for a finished archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub files: usize,
    pub bytes: u64,
}

/// Write every manifest file to a new archive at `destination`.
///
/// The destination is truncated first. `counter` is bumped once per file,
/// after the file's bytes are in the archive. The first I/O error aborts the
/// whole archive; whatever was already written stays on disk.
pub fn write_archive(
    manifest: &Manifest,
    destination: &Path,
    options: &ArchiveOptions,
    counter: &ProgressCounter,
) -> Result<WriteStats> {
    let file = File::create(destination)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let mut buffer = vec![0u8; options.chunk_size.max(1)];
    let mut stats = WriteStats::default();

    for info in &manifest.files {
        let mut source = File::open(&info.path)?;
        // The file may have grown since the walk
        let size = source.metadata()?.len().max(info.size);

        zip.start_file(manifest.entry_name(info), options.file_options(size))?;
        stats.bytes += copy_chunked(&mut source, &mut zip, &mut buffer)?;

        stats.files += 1;
        counter.increment();
    }

    let mut out = zip.finish()?;
    out.flush()?;
    out.get_ref().sync_all()?;

    Ok(stats)
}

fn copy_chunked<R: Read, W: Write>(reader: &mut R, writer: &mut W, buffer: &mut [u8]) -> io::Result<u64> {
    let mut copied = 0u64;
    loop {
        let n = match reader.read(buffer) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..n])?;
        copied += n as u64;
    }
}
