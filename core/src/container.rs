//! OPC (Open Packaging Conventions) container handling.
//!
//! Read-only access to the ZIP package of one spreadsheet document. Opening
//! validates that `[Content_Types].xml` is present; reads are bounded by
//! [`ContainerLimits`] so a hostile archive cannot balloon memory.

use std::io::{Read, Seek};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Ceilings applied while reading one package. The defaults are sized for
/// hand-authored test workbooks; anything larger is more likely a zip bomb
/// than a spreadsheet worth auditing.
#[derive(Debug, Clone, Copy)]
pub struct ContainerLimits {
    /// Ceiling on the number of archive entries.
    pub max_entries: usize,
    /// Ceiling on the uncompressed size of a single part.
    pub max_part_uncompressed_bytes: u64,
    /// Ceiling on the uncompressed bytes read across the whole package.
    pub max_total_uncompressed_bytes: u64,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        Self {
            max_entries: 4_096,
            max_part_uncompressed_bytes: 64 * 1024 * 1024,
            max_total_uncompressed_bytes: 256 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a ZIP container")]
    NotZipContainer,
    #[error("not an OPC package (missing [Content_Types].xml)")]
    NotOpcPackage,
    #[error("archive declares {entries} entries, more than the {max_entries} allowed")]
    TooManyEntries { entries: usize, max_entries: usize },
    #[error("part '{path}' would expand to {size} bytes, more than the {limit} allowed")]
    PartTooLarge { path: String, size: u64, limit: u64 },
    #[error("package would expand past the {limit} byte total budget")]
    TotalTooLarge { limit: u64 },
    #[error("failed to read part '{path}': {reason}")]
    PartRead { path: String, reason: String },
    #[error("part not found: {path}")]
    PartNotFound { path: String },
}

pub(crate) trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// An open spreadsheet container. Owned by a single validation call and
/// never shared across threads.
pub struct OpcContainer {
    archive: ZipArchive<Box<dyn ReadSeek>>,
    limits: ContainerLimits,
    total_read: u64,
}

impl std::fmt::Debug for OpcContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcContainer")
            .field("limits", &self.limits)
            .field("total_read", &self.total_read)
            .finish_non_exhaustive()
    }
}

impl OpcContainer {
    pub fn open_from_reader<R: Read + Seek + 'static>(
        reader: R,
    ) -> Result<OpcContainer, ContainerError> {
        Self::open_from_reader_with_limits(reader, ContainerLimits::default())
    }

    pub fn open_from_reader_with_limits<R: Read + Seek + 'static>(
        reader: R,
        limits: ContainerLimits,
    ) -> Result<OpcContainer, ContainerError> {
        let reader: Box<dyn ReadSeek> = Box::new(reader);
        let archive = ZipArchive::new(reader).map_err(|err| match err {
            ZipError::Io(e) => ContainerError::Io(e),
            ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
                ContainerError::NotZipContainer
            }
            other => ContainerError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                other.to_string(),
            )),
        })?;

        let entries = archive.len();
        if entries > limits.max_entries {
            return Err(ContainerError::TooManyEntries {
                entries,
                max_entries: limits.max_entries,
            });
        }
        if !archive
            .file_names()
            .any(|name| name == "[Content_Types].xml")
        {
            return Err(ContainerError::NotOpcPackage);
        }

        Ok(OpcContainer {
            archive,
            limits,
            total_read: 0,
        })
    }

    pub fn open_from_path(
        path: impl AsRef<std::path::Path>,
    ) -> Result<OpcContainer, ContainerError> {
        let file = std::fs::File::open(path)?;
        Self::open_from_reader(file)
    }

    /// Read one part fully into memory, enforcing the container limits.
    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>, ContainerError> {
        let size = {
            let file = self.archive.by_name(name).map_err(|e| match e {
                ZipError::FileNotFound => ContainerError::PartNotFound {
                    path: name.to_string(),
                },
                other => ContainerError::PartRead {
                    path: name.to_string(),
                    reason: other.to_string(),
                },
            })?;
            file.size()
        };

        if size > self.limits.max_part_uncompressed_bytes {
            return Err(ContainerError::PartTooLarge {
                path: name.to_string(),
                size,
                limit: self.limits.max_part_uncompressed_bytes,
            });
        }

        let new_total = self.total_read.saturating_add(size);
        if new_total > self.limits.max_total_uncompressed_bytes {
            return Err(ContainerError::TotalTooLarge {
                limit: self.limits.max_total_uncompressed_bytes,
            });
        }

        let mut file = self
            .archive
            .by_name(name)
            .map_err(|e| ContainerError::PartRead {
                path: name.to_string(),
                reason: e.to_string(),
            })?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| ContainerError::PartRead {
                path: name.to_string(),
                reason: e.to_string(),
            })?;

        self.total_read = new_total;
        Ok(buf)
    }

    /// Like [`read_part`](Self::read_part), but a missing part is `Ok(None)`.
    pub fn read_part_optional(&mut self, name: &str) -> Result<Option<Vec<u8>>, ContainerError> {
        match self.read_part(name) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(ContainerError::PartNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn limits(&self) -> &ContainerLimits {
        &self.limits
    }
}
