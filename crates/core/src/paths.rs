//! Translation of torrent-client save paths to locally mounted paths.
//!
//! The client sees its downloads under `remote_download_prefix`; this process
//! sees the same storage under `local_download_prefix`.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathMapError {
    #[error("path escapes download root: {path}")]
    OutsideRoot { path: String },
}

#[derive(Debug, Clone)]
pub struct PathMapper {
    remote_prefix: String,
    local_prefix: PathBuf,
}

impl PathMapper {
    pub fn new(remote_prefix: impl Into<String>, local_prefix: impl Into<PathBuf>) -> Self {
        let remote_prefix: String = remote_prefix.into();
        Self {
            remote_prefix: remote_prefix.trim_end_matches('/').to_string(),
            local_prefix: local_prefix.into(),
        }
    }

    pub fn local_prefix(&self) -> &Path {
        &self.local_prefix
    }

    /// Map a torrent's save path and a file name relative to it onto the local mount.
    ///
    /// The remote prefix is stripped from `save_path` when present. Both the
    /// remaining save path and `relative_name` must stay inside the local
    /// prefix: `..` segments and absolute relative names are rejected.
    pub fn to_local(&self, save_path: &str, relative_name: &str) -> Result<PathBuf, PathMapError> {
        let outside = || PathMapError::OutsideRoot {
            path: format!("{}/{}", save_path.trim_end_matches('/'), relative_name),
        };

        if relative_name.is_empty() || Path::new(relative_name).is_absolute() {
            return Err(outside());
        }

        let remainder = self.strip_remote_prefix(save_path);

        let mut local = self.local_prefix.clone();
        for part in remainder.split('/').chain(relative_name.split('/')) {
            match part {
                "" | "." => continue,
                ".." => return Err(outside()),
                segment => {
                    // A segment must be a single normal component on this platform.
                    let mut components = Path::new(segment).components();
                    match (components.next(), components.next()) {
                        (Some(Component::Normal(_)), None) => local.push(segment),
                        _ => return Err(outside()),
                    }
                }
            }
        }

        Ok(local)
    }

    fn strip_remote_prefix<'a>(&self, save_path: &'a str) -> &'a str {
        if self.remote_prefix.is_empty() {
            return save_path;
        }
        match save_path.strip_prefix(self.remote_prefix.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => save_path,
        }
    }
}
