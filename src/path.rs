//! Resource paths of the keys namespace

/// Builds `<version-prefix>/keys<key>` paths.
///
/// Keys are appended verbatim: no escaping, no slash normalization, no validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBuilder {
    key_endpoint: String,
}

impl PathBuilder {
    /// Create a builder for the given version prefix, e.g. `/v2`
    pub fn new(version_prefix: &str) -> Self {
        Self {
            key_endpoint: format!("{}/keys", version_prefix),
        }
    }

    /// The `<version-prefix>/keys` root
    pub fn key_endpoint(&self) -> &str {
        &self.key_endpoint
    }

    /// Path of a key or directory
    pub fn key(&self, key: &str) -> String {
        let mut path = String::with_capacity(self.key_endpoint.len() + key.len());
        path.push_str(&self.key_endpoint);
        path.push_str(key);
        path
    }
}
