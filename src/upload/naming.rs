use sha2::{Digest, Sha256};

use crate::upload::UploadError;

/// Image types accepted for compression
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Content-derived storage name for an accepted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadName {
    /// Hex SHA-256 of the sanitized original filename
    pub hash: String,
    /// Lower-cased extension without the dot
    pub extension: String,
}

impl UploadName {
    /// `<hash>.<ext>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.hash, self.extension)
    }

    /// `<hash>_compressed_<k>.<ext>`
    pub fn compressed_file_name(&self, k: usize) -> String {
        format!("{}_compressed_{}.{}", self.hash, k, self.extension)
    }
}

/// Checks uploaded filenames before anything touches the disk
#[derive(Debug, Clone)]
pub struct UploadValidator {
    allowed: Vec<String>,
}

impl UploadValidator {
    pub fn new() -> Self {
        Self::with_extensions(ALLOWED_EXTENSIONS.iter().copied())
    }

    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn is_allowed(&self, filename: &str) -> bool {
        extension_of(filename)
            .map(|ext| self.allowed.iter().any(|a| *a == ext))
            .unwrap_or(false)
    }

    /// Validate an upload and derive its storage name.
    ///
    /// Rejects empty names and bodies, names without an extension, and
    /// extensions outside the allowed set.
    pub fn validate(&self, raw_name: &str, bytes: &[u8]) -> Result<UploadName, UploadError> {
        if raw_name.trim().is_empty() {
            return Err(UploadError::MissingFile);
        }

        let safe_name = Self::sanitize(raw_name)?;

        let extension = extension_of(&safe_name)
            .ok_or_else(|| UploadError::NoExtension(raw_name.to_string()))?;
        if !self.allowed.iter().any(|a| *a == extension) {
            return Err(UploadError::DisallowedExtension(extension));
        }

        if bytes.is_empty() {
            return Err(UploadError::EmptyUpload(raw_name.to_string()));
        }

        Ok(UploadName {
            hash: hash_name(&safe_name),
            extension,
        })
    }

    /// Reduce a client-supplied filename to a safe flat name:
    /// - path separators and whitespace runs become `_`
    /// - anything outside `[A-Za-z0-9._-]` is removed
    /// - leading and trailing `.`/`_` are trimmed
    ///
    /// `a/b/my file.png` becomes `a_b_my_file.png` and `../etc/passwd.png`
    /// becomes `etc_passwd.png`, so the result never names a directory.
    pub fn sanitize(raw_name: &str) -> Result<String, UploadError> {
        let flattened = raw_name.replace(['/', '\\'], " ");

        let cleaned: String = flattened
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();
        let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_').to_string();

        if cleaned.is_empty() {
            return Err(UploadError::InvalidPath(format!(
                "Nothing left after sanitizing: {}",
                raw_name
            )));
        }

        Ok(cleaned)
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

fn hash_name(name: &str) -> String {
    hex::encode(Sha256::digest(name.as_bytes()))
}
