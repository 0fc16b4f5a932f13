//! Error types for label storage, label formats and the editing session.

use thiserror::Error;

/// Failures of the label store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No label file with that name exists yet.
    #[error("Annotation file not found: {0}")]
    NotFound(String),

    /// The name is empty or tries to leave the labels folder.
    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    /// Only `.txt` and `.json` label files are accepted.
    #[error("Invalid file extension: {0:?}")]
    InvalidExtension(String),

    #[error("Content is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while decoding or encoding a label file.
#[derive(Error, Debug)]
pub enum FormatError {
    /// A detection line that is not `class cx cy w h`.
    #[error("Line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pixel sizes are needed to convert between COCO and normalized shapes.
    #[error("Image has no pixels ({width} x {height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Failures surfaced by session commands.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Failed to open image: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An annotation file whose base name matches none of the loaded images.
    #[error("No image matches {0}")]
    NoMatchingImage(String),

    #[error("No image is open")]
    NoImageOpen,
}
