//! Gzip helpers. Compression runs on the blocking pool.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{BackupError, BackupResult};

/// Gzip `src` into `dst`, returning the compressed length.
pub(super) async fn gzip_file(src: &Path, dst: &Path) -> BackupResult<u64> {
    let (src, dst): (PathBuf, PathBuf) = (src.to_path_buf(), dst.to_path_buf());
    tokio::task::spawn_blocking(move || -> BackupResult<u64> {
        let raw = std::fs::read(&src)?;
        let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 4), Compression::default());
        encoder
            .write_all(&raw)
            .map_err(|e| BackupError::Compression(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| BackupError::Compression(e.to_string()))?;
        std::fs::write(&dst, &compressed)?;
        Ok(compressed.len() as u64)
    })
    .await
    .map_err(|e| BackupError::Compression(e.to_string()))?
}

/// Fully decompress a gzip payload.
pub(super) async fn gunzip(compressed: Vec<u8>) -> BackupResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || -> BackupResult<Vec<u8>> {
        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| BackupError::Compression(e.to_string()))?;
        Ok(out)
    })
    .await
    .map_err(|e| BackupError::Compression(e.to_string()))?
}
