//! Streamed file copy into a flat library directory.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Errors that can occur while copying a book file.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("source has no file name: {path}")]
    NoFileName { path: PathBuf },

    #[error("failed to create directory {path}: {error}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to copy {from} to {to}: {error}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl CopyError {
    fn copy_failed(from: &Path, to: &Path, error: std::io::Error) -> Self {
        CopyError::CopyFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error,
        }
    }
}

/// Copies files into a directory, keeping only their base name.
#[derive(Debug, Clone)]
pub struct FileCopier {
    buffer_size: usize,
    verify_checksums: bool,
}

impl Default for FileCopier {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            verify_checksums: false,
        }
    }
}

impl FileCopier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare SHA-256 of source and destination after each copy.
    pub fn with_checksum_verification(mut self, enabled: bool) -> Self {
        self.verify_checksums = enabled;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Copy `source` to `directory/<basename of source>`, creating `directory`
    /// when missing. An existing destination file is overwritten.
    pub async fn copy_into(&self, source: &Path, directory: &Path) -> Result<PathBuf, CopyError> {
        let file_name = source.file_name().ok_or_else(|| CopyError::NoFileName {
            path: source.to_path_buf(),
        })?;

        fs::create_dir_all(directory)
            .await
            .map_err(|error| CopyError::DirectoryCreationFailed {
                path: directory.to_path_buf(),
                error,
            })?;

        let destination = directory.join(file_name);
        let (bytes, source_checksum) = self.copy_file(source, &destination).await?;

        if let Some(expected) = source_checksum {
            let actual = self.checksum(&destination).await?;
            if actual != expected {
                return Err(CopyError::ChecksumMismatch {
                    path: destination,
                    expected,
                    actual,
                });
            }
        }

        debug!(
            source = %source.display(),
            destination = %destination.display(),
            bytes = bytes,
            "Copied file"
        );
        Ok(destination)
    }

    /// Copy with an optional checksum of the bytes read.
    async fn copy_file(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<(u64, Option<String>), CopyError> {
        let source_file = File::open(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CopyError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                CopyError::copy_failed(source, destination, e)
            }
        })?;

        let dest_file = File::create(destination)
            .await
            .map_err(|e| CopyError::copy_failed(source, destination, e))?;

        let mut reader = BufReader::with_capacity(self.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.buffer_size, dest_file);
        let mut hasher = self.verify_checksums.then(Sha256::new);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .await
                .map_err(|e| CopyError::copy_failed(source, destination, e))?;
            if bytes_read == 0 {
                break;
            }

            if let Some(ref mut h) = hasher {
                h.update(&buffer[..bytes_read]);
            }

            writer
                .write_all(&buffer[..bytes_read])
                .await
                .map_err(|e| CopyError::copy_failed(source, destination, e))?;
            total_bytes += bytes_read as u64;
        }

        writer
            .flush()
            .await
            .map_err(|e| CopyError::copy_failed(source, destination, e))?;

        Ok((total_bytes, hasher.map(|h| format!("{:x}", h.finalize()))))
    }

    async fn checksum(&self, path: &Path) -> Result<String, CopyError> {
        let read_failed = |e: std::io::Error| CopyError::copy_failed(path, path, e);
        let file = File::open(path).await.map_err(read_failed)?;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let mut buffer = vec![0u8; self.buffer_size];
        let mut hasher = Sha256::new();

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(read_failed)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}
