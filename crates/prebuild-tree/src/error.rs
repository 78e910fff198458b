//! Keypath errors.

/// Errors raised while parsing a keypath or writing through one.
///
/// Reading an absent location is not an error; see [`crate::ValueTree::get`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeypathError {
    #[error("Keypath is empty")]
    EmptyPath,

    #[error("Malformed keypath '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("Index {index} out of range for '{key}' (length {len})")]
    IndexOutOfRange { key: String, index: usize, len: usize },

    #[error("Expected {expected} at '{key}', found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl KeypathError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        KeypathError::MalformedPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
