//! Converters between supported payload kinds.
//!
//! Pipeline values that cross the boundary to storage come in a closed set
//! of shapes; [Payload] tags them explicitly and the conversion functions
//! match on the tag.  Unsupported conversions fail loudly, never silently.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_core::future::BoxFuture;

use crate::datasource::PipelineError;

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Bytes(Bytes),
    /// An existing file on disk.
    File(PathBuf),
    /// Named sub-payloads; persisted as a directory.
    Entries(BTreeMap<String, Payload>),
    Many(Vec<Payload>),
}

#[derive(Debug, Clone, Default)]
pub struct PersistOptions {
    /// Create missing parent directories.
    pub mkdir: bool,
    /// Overwrite an existing destination instead of failing.
    pub overwrite: bool,
}

impl Payload {
    /// Convert the payload to text.  A `Many` payload is converted
    /// element-wise and joined with newlines; an entry mapping has no text
    /// form.
    pub fn into_text(self) -> BoxFuture<'static, Result<String, PipelineError>> {
        Box::pin(async move {
            match self {
                Payload::Text(text) => Ok(text),
                Payload::Bytes(bytes) => String::from_utf8(bytes.to_vec())
                    .map_err(|er| PipelineError::deserialize(er, "binary payload")),
                Payload::File(path) => Ok(tokio::fs::read_to_string(&path).await?),
                Payload::Many(items) => {
                    let mut parts = Vec::with_capacity(items.len());
                    for item in items {
                        parts.push(item.into_text().await?);
                    }
                    Ok(parts.join("\n"))
                }
                Payload::Entries(_) => Err(PipelineError::Generic(
                    "cannot convert an entry mapping to text".to_string(),
                )),
            }
        })
    }

    /// Convert the payload to bytes.  A `Many` payload is concatenated;
    /// an entry mapping has no flat binary form.
    pub fn into_bytes(self) -> BoxFuture<'static, Result<Bytes, PipelineError>> {
        Box::pin(async move {
            match self {
                Payload::Text(text) => Ok(Bytes::from(text.into_bytes())),
                Payload::Bytes(bytes) => Ok(bytes),
                Payload::File(path) => Ok(Bytes::from(tokio::fs::read(&path).await?)),
                Payload::Many(items) => {
                    let mut content = Vec::new();
                    for item in items {
                        content.extend_from_slice(item.into_bytes().await?.as_ref());
                    }
                    Ok(Bytes::from(content))
                }
                Payload::Entries(_) => Err(PipelineError::Generic(
                    "cannot convert an entry mapping to bytes".to_string(),
                )),
            }
        })
    }

    /// Write the payload to `dest` and return the path it now lives at.
    ///
    /// `Entries` become a directory with one child per entry; `Many` has
    /// no single-path form and fails.
    pub fn persist<'a>(
        &'a self,
        dest: &'a Path,
        options: &'a PersistOptions,
    ) -> BoxFuture<'a, Result<PathBuf, PipelineError>> {
        Box::pin(async move {
            match self {
                Payload::Text(text) => {
                    check_dest(dest, options).await?;
                    tokio::fs::write(dest, text.as_bytes()).await?;
                    log::debug!("persisted text payload to {:?}", dest);
                    Ok(dest.to_path_buf())
                }
                Payload::Bytes(bytes) => {
                    check_dest(dest, options).await?;
                    tokio::fs::write(dest, bytes.as_ref()).await?;
                    log::debug!("persisted binary payload to {:?}", dest);
                    Ok(dest.to_path_buf())
                }
                Payload::File(source) => {
                    if source == dest {
                        return Ok(source.clone());
                    }
                    check_dest(dest, options).await?;
                    tokio::fs::copy(source, dest).await?;
                    log::debug!("copied file payload {:?} to {:?}", source, dest);
                    Ok(dest.to_path_buf())
                }
                Payload::Entries(entries) => {
                    if dest.exists() {
                        if options.overwrite {
                            tokio::fs::remove_dir_all(dest).await?;
                        } else {
                            return Err(PipelineError::FatalIO(format!(
                                "folder `{}` already exists",
                                dest.display()
                            )));
                        }
                    }
                    if options.mkdir {
                        if let Some(parent) = dest.parent() {
                            tokio::fs::create_dir_all(parent).await?;
                        }
                    }
                    tokio::fs::create_dir(dest).await?;
                    for (name, child) in entries {
                        child.persist(&dest.join(name), options).await?;
                    }
                    log::debug!("persisted {} entries to {:?}", entries.len(), dest);
                    Ok(dest.to_path_buf())
                }
                Payload::Many(_) => Err(PipelineError::Generic(
                    "cannot persist multiple payloads to a single path".to_string(),
                )),
            }
        })
    }
}

async fn check_dest(dest: &Path, options: &PersistOptions) -> Result<(), PipelineError> {
    if dest.exists() {
        if dest.is_dir() {
            return Err(PipelineError::FatalIO(format!(
                "destination `{}` is a directory",
                dest.display()
            )));
        }
        if !options.overwrite {
            return Err(PipelineError::FatalIO(format!(
                "file `{}` already exists",
                dest.display()
            )));
        }
    }
    if options.mkdir {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}
