use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("No file selected")]
    MissingFile,

    #[error("Uploaded file is empty: {0}")]
    EmptyUpload(String),

    #[error("File has no extension: {0}")]
    NoExtension(String),

    #[error("Extension not allowed: {0}")]
    DisallowedExtension(String),

    #[error("Invalid upload path: {0}")]
    InvalidPath(String),

    #[error("Another upload in this batch is already stored as {0}")]
    DuplicateName(String),
}
