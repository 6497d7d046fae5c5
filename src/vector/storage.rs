//! Binary storage for the vector half of an answer snapshot.
//!
//! Vectors are linked to corpus entries only by position, so this file
//! stores pairs in exactly the order they were inserted and nothing else.
//!
//! # Storage Format
//!
//! - Header (16 bytes): magic `AGVP`, version, dimension, pair count
//! - Body: for each pair, the question vector then the answer vector,
//!   each `dimension` f32 values in little-endian format
//!
//! Reads go through a memory map; writes go to a temporary file in the
//! destination directory which is then renamed over the target.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::vector::types::{VectorDimension, VectorError, VectorPair};

/// Current storage format version.
const STORAGE_VERSION: u32 = 1;

/// Size of the storage header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify vector pair files.
const MAGIC_BYTES: &[u8; 4] = b"AGVP";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Errors specific to vector storage operations.
#[derive(Error, Debug)]
pub enum VectorStorageError {
    #[error("IO error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Invalid storage format in '{path}': {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Invalid vector data in '{path}': {source}")]
    Vector { path: PathBuf, source: VectorError },
}

impl VectorStorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn format(path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn vector(path: &Path, source: VectorError) -> Self {
        Self::Vector {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Header of a vector pair file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorFileHeader {
    pub version: u32,
    pub dimension: VectorDimension,
    pub pair_count: usize,
}

/// Positional vector pair file.
#[derive(Debug, Clone)]
pub struct VectorPairFile {
    path: PathBuf,
}

impl VectorPairFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks if the storage file exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes all pairs, replacing any existing file.
    ///
    /// Every pair is validated against `dimension` before anything touches
    /// the disk.
    pub fn write_all(
        &self,
        dimension: VectorDimension,
        pairs: &[VectorPair],
    ) -> Result<(), VectorStorageError> {
        for pair in pairs {
            pair.validate(dimension)
                .map_err(|e| VectorStorageError::vector(&self.path, e))?;
        }
        let pair_count = u32::try_from(pairs.len())
            .map_err(|_| VectorStorageError::format(&self.path, "Too many vectors for format"))?;
        let dim_value = u32::try_from(dimension.get())
            .map_err(|_| VectorStorageError::format(&self.path, "Dimension too large for format"))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| VectorStorageError::io(&dir, e))?;

        let temp = NamedTempFile::new_in(&dir).map_err(|e| VectorStorageError::io(&dir, e))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            let io_err = |e| VectorStorageError::io(&self.path, e);

            writer.write_all(MAGIC_BYTES).map_err(io_err)?;
            writer
                .write_all(&STORAGE_VERSION.to_le_bytes())
                .map_err(io_err)?;
            writer.write_all(&dim_value.to_le_bytes()).map_err(io_err)?;
            writer.write_all(&pair_count.to_le_bytes()).map_err(io_err)?;

            for pair in pairs {
                for &value in pair.question.iter().chain(pair.answer.iter()) {
                    writer.write_all(&value.to_le_bytes()).map_err(io_err)?;
                }
            }
            writer.flush().map_err(io_err)?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| VectorStorageError::io(&self.path, e))?;
        temp.persist(&self.path)
            .map_err(|e| VectorStorageError::io(&self.path, e.error))?;

        Ok(())
    }

    /// Reads only the header.
    pub fn read_header(&self) -> Result<VectorFileHeader, VectorStorageError> {
        let bytes = std::fs::read(&self.path).map_err(|e| VectorStorageError::io(&self.path, e))?;
        self.parse_header(&bytes)
    }

    /// Reads every pair in stored order.
    ///
    /// The declared size must match the file exactly and every value must
    /// be finite; anything else is reported as `InvalidFormat`.
    pub fn read_all(&self) -> Result<(VectorFileHeader, Vec<VectorPair>), VectorStorageError> {
        let file = File::open(&self.path).map_err(|e| VectorStorageError::io(&self.path, e))?;
        let len = file
            .metadata()
            .map_err(|e| VectorStorageError::io(&self.path, e))?
            .len();
        if (len as usize) < HEADER_SIZE {
            return Err(VectorStorageError::format(
                &self.path,
                "File too small to contain header",
            ));
        }
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .map_err(|e| VectorStorageError::io(&self.path, e))?;

        let header = self.parse_header(&mmap)?;
        let dim = header.dimension.get();
        let expected_len = header
            .pair_count
            .checked_mul(2 * BYTES_PER_F32)
            .and_then(|bytes| bytes.checked_mul(dim))
            .and_then(|bytes| bytes.checked_add(HEADER_SIZE))
            .ok_or_else(|| {
                VectorStorageError::format(
                    &self.path,
                    format!(
                        "Header declares {} pairs of width {dim}, which overflows the file size",
                        header.pair_count
                    ),
                )
            })?;
        if mmap.len() != expected_len {
            return Err(VectorStorageError::format(
                &self.path,
                format!(
                    "Header declares {} pairs of width {} ({} bytes) but file has {} bytes",
                    header.pair_count,
                    dim,
                    expected_len,
                    mmap.len()
                ),
            ));
        }

        let mut values = mmap[HEADER_SIZE..]
            .chunks_exact(BYTES_PER_F32)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]));

        let mut pairs = Vec::with_capacity(header.pair_count);
        for position in 0..header.pair_count {
            let question: Vec<f32> = values.by_ref().take(dim).collect();
            let answer: Vec<f32> = values.by_ref().take(dim).collect();
            let pair = VectorPair::new(question, answer);
            pair.validate(header.dimension).map_err(|e| {
                VectorStorageError::format(&self.path, format!("pair {position}: {e}"))
            })?;
            pairs.push(pair);
        }

        Ok((header, pairs))
    }

    fn parse_header(&self, bytes: &[u8]) -> Result<VectorFileHeader, VectorStorageError> {
        if bytes.len() < HEADER_SIZE {
            return Err(VectorStorageError::format(
                &self.path,
                "File too small to contain header",
            ));
        }

        if &bytes[0..4] != MAGIC_BYTES {
            return Err(VectorStorageError::format(&self.path, "Invalid magic bytes"));
        }

        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != STORAGE_VERSION {
            return Err(VectorStorageError::vector(
                &self.path,
                VectorError::VersionMismatch {
                    expected: STORAGE_VERSION,
                    actual: version,
                },
            ));
        }

        let dim_value = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let dimension = VectorDimension::new(dim_value as usize)
            .map_err(|e| VectorStorageError::vector(&self.path, e))?;
        let pair_count = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;

        Ok(VectorFileHeader {
            version,
            dimension,
            pair_count,
        })
    }
}
