mod error;
mod naming;

#[cfg(test)]
mod tests;

pub use error::UploadError;
pub use naming::{UploadName, UploadValidator, ALLOWED_EXTENSIONS};
