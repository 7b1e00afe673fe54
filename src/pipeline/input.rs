//! Input resolution: find image files, group them by book, decode them.
//!
//! ## Naming convention
//!
//! All photos of one book share a file-name prefix followed by an underscore
//! and a page number: `book1_1.jpg`, `book1_2.jpg` belong to `book1`. The
//! prefix is the *book key*; a file without an underscore is a book of its
//! own keyed by its whole file name.

use crate::error::BookMetaError;
use image::DynamicImage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions (lower-case) accepted as book photos.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Check if a path has one of the [`IMAGE_EXTENSIONS`], case-insensitively.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// List the image files directly inside `folder`, sorted by path.
///
/// Sub-directories are not descended into.
pub fn collect_images(folder: &Path) -> Result<Vec<PathBuf>, BookMetaError> {
    let entries = std::fs::read_dir(folder).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => BookMetaError::PermissionDenied {
            path: folder.to_path_buf(),
        },
        _ => BookMetaError::FileNotFound {
            path: folder.to_path_buf(),
        },
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| readable(folder, entry))
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_image_path(p))
        .collect();
    paths.sort();

    debug!("Found {} images in {}", paths.len(), folder.display());
    Ok(paths)
}

/// Keep a directory entry that could be read; log and drop one that could not.
fn readable<T>(folder: &Path, entry: std::io::Result<T>) -> Option<T> {
    match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            debug!("Skipping unreadable entry in {}: {}", folder.display(), e);
            None
        }
    }
}

/// The book key of an image path: its file name up to the first `_`.
pub fn book_key(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    match name.split_once('_') {
        Some((key, _)) => key.to_string(),
        None => name.into_owned(),
    }
}

/// Group image paths by [`book_key`].
///
/// Keys are sorted and so are the paths inside each book, which makes the
/// result independent of the input order.
pub fn group_by_book<P: AsRef<Path>>(paths: &[P]) -> BTreeMap<String, Vec<PathBuf>> {
    let mut books: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in paths {
        let path = path.as_ref();
        books.entry(book_key(path)).or_default().push(path.to_path_buf());
    }
    for images in books.values_mut() {
        images.sort();
    }
    books
}

/// Decode one image file.
pub fn load_image(path: &Path) -> Result<DynamicImage, BookMetaError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => BookMetaError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => BookMetaError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => BookMetaError::NotAnImage {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;

    let img = image::load_from_memory(&bytes).map_err(|e| BookMetaError::NotAnImage {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    debug!("Loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img)
}

/// Decode every image of a book on the blocking pool, preserving order.
pub async fn load_images(paths: &[PathBuf]) -> Result<Vec<DynamicImage>, BookMetaError> {
    let paths = paths.to_vec();
    tokio::task::spawn_blocking(move || -> Result<Vec<DynamicImage>, BookMetaError> {
        paths.iter().map(|p| load_image(p)).collect()
    })
    .await
    .map_err(|e| BookMetaError::Internal(format!("Image decode task panicked: {}", e)))?
}
