//! Dataset archive scanning.
//!
//! Reads an uploaded ZIP archive and derives the classification classes implied
//! by its folder layout: every image directly or indirectly under a top-level
//! folder counts toward a class named after that folder. Used to pre-populate
//! the "train with real data" form without a round trip to the backend.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use zip::ZipArchive;

use crate::constants::{ARCHIVE_PATH_SEPARATOR, CLASS_IMAGE_EXTENSIONS};

/// Errors produced while scanning a dataset archive.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The bytes could not be decoded as a ZIP archive (corrupt data,
    /// unsupported compression, truncated upload).
    #[error("Invalid ZIP archive: {0}")]
    ArchiveRead(#[from] zip::result::ZipError),

    /// The archive decoded fine but no image sits inside a folder.
    #[error(
        "No classes detected. Organize the images into subfolders, one per class \
         (for example cats/img1.jpg, dogs/img2.jpg)"
    )]
    NoClassesDetected,

    /// The archive file could not be opened (native only).
    #[cfg(not(target_arch = "wasm32"))]
    #[error("Failed to open archive: {0}")]
    Io(#[from] std::io::Error),
}

/// One record of the decoded archive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Slash-separated path relative to the archive root
    pub path: String,
    /// Whether the record is a directory
    pub is_dir: bool,
}

impl ArchiveEntry {
    /// A regular file entry.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    /// A directory entry.
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }
}

/// A class inferred from a top-level folder of the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedClass {
    /// Zero-based position in ordinal name order
    pub index: usize,
    /// Top-level folder name
    pub name: String,
    /// Number of images attributed to this folder (any depth)
    pub image_count: usize,
}

/// Result of scanning an archive: classes in index order plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassScan {
    classes: Vec<DetectedClass>,
    total_classes: usize,
    total_images: usize,
}

impl ClassScan {
    fn from_counts(counts: BTreeMap<String, usize>) -> Self {
        // BTreeMap<String, _> iterates in byte order, which for UTF-8 is code-point order.
        let classes: Vec<DetectedClass> = counts
            .into_iter()
            .enumerate()
            .map(|(index, (name, image_count))| DetectedClass {
                index,
                name,
                image_count,
            })
            .collect();

        let total_images = classes.iter().map(|c| c.image_count).sum();

        Self {
            total_classes: classes.len(),
            total_images,
            classes,
        }
    }

    /// Detected classes, sorted by name.
    pub fn classes(&self) -> &[DetectedClass] {
        &self.classes
    }

    /// Number of detected classes.
    pub fn total_classes(&self) -> usize {
        self.total_classes
    }

    /// Number of images that were attributed to some class.
    pub fn total_images(&self) -> usize {
        self.total_images
    }

    /// Class names in index order.
    pub fn class_names(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Check if a filename has the `.zip` extension the backend accepts.
///
/// The server compares the suffix case-sensitively, so `DATA.ZIP` is refused
/// here rather than after a full upload.
pub fn is_zip_file(filename: &str) -> bool {
    filename.ends_with(".zip")
}

/// Check whether the final path segment carries an allowed image extension.
pub fn is_image_file(path: &str) -> bool {
    let file_name = path
        .rsplit(ARCHIVE_PATH_SEPARATOR)
        .next()
        .unwrap_or(path);

    match file_name.rsplit_once('.') {
        Some((_, ext)) => CLASS_IMAGE_EXTENSIONS
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// First path segment, if the entry is nested in a named folder.
fn class_name_of(path: &str) -> Option<&str> {
    let mut segments = path.split(ARCHIVE_PATH_SEPARATOR);
    let first = segments.next()?;
    segments.next()?;
    (!first.is_empty()).then_some(first)
}

/// Derive classes from a decoded archive listing.
///
/// Directories and non-image files are skipped, as are images at the archive
/// root. Names are compared case-sensitively, so `Cats` and `cats` are
/// separate classes.
pub fn detect_classes<'a, I>(entries: I) -> Result<ClassScan, ScanError>
where
    I: IntoIterator<Item = &'a ArchiveEntry>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for entry in entries {
        if entry.is_dir {
            continue;
        }

        if !is_image_file(&entry.path) {
            log::trace!("Skipping non-image: {}", entry.path);
            continue;
        }

        match class_name_of(&entry.path) {
            Some(name) => *counts.entry(name.to_string()).or_insert(0) += 1,
            None => log::trace!("Skipping root-level image: {}", entry.path),
        }
    }

    if counts.is_empty() {
        return Err(ScanError::NoClassesDetected);
    }

    Ok(ClassScan::from_counts(counts))
}

/// Decode the listing of a ZIP archive from any seekable reader.
///
/// Every entry is opened so that unsupported compression methods surface here
/// rather than later on the server; contents are never read.
pub fn list_entries_from_reader<R: Read + Seek>(reader: R) -> Result<Vec<ArchiveEntry>, ScanError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        entries.push(ArchiveEntry {
            path: file.name().to_string(),
            is_dir: file.is_dir(),
        });
    }

    log::debug!("ZIP contains {} entries", entries.len());
    Ok(entries)
}

/// Decode the listing of a ZIP archive held in memory.
pub fn list_entries(zip_data: &[u8]) -> Result<Vec<ArchiveEntry>, ScanError> {
    list_entries_from_reader(Cursor::new(zip_data))
}

/// Scan an in-memory ZIP archive for classes.
pub fn scan_archive_bytes(zip_data: &[u8]) -> Result<ClassScan, ScanError> {
    log::info!("Scanning ZIP archive ({} bytes)", zip_data.len());

    let entries = list_entries(zip_data)?;
    let scan = detect_classes(&entries)?;

    log::info!(
        "Detected {} classes ({} images)",
        scan.total_classes(),
        scan.total_images()
    );
    Ok(scan)
}

/// Scan a ZIP archive on disk for classes (native only).
#[cfg(not(target_arch = "wasm32"))]
pub fn scan_archive_file(path: &Path) -> Result<ClassScan, ScanError> {
    log::info!("Opening ZIP file: {:?}", path);

    let file = std::fs::File::open(path)?;
    let entries = list_entries_from_reader(file)?;
    detect_classes(&entries)
}
