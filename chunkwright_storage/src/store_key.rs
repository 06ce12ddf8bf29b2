use thiserror::Error;

/// A store key.
///
/// Keys are slash-delimited paths relative to the store root, such as
/// `acquisition/series/c/0.0`. A valid key has no leading or trailing slash
/// and no empty, `.`, or `..` segments.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StoreKey(String);

/// A list of [`StoreKey`].
pub type StoreKeys = Vec<StoreKey>;

/// An invalid store key error.
#[derive(Clone, Debug, Error)]
#[error("invalid store key {_0}")]
pub struct StoreKeyError(String);

impl StoreKey {
    /// Create a new store key from `key`.
    ///
    /// # Errors
    /// Returns [`StoreKeyError`] if `key` is not valid.
    pub fn new(key: impl Into<String>) -> Result<Self, StoreKeyError> {
        let key = key.into();
        if Self::validate(&key) {
            Ok(Self(key))
        } else {
            Err(StoreKeyError(key))
        }
    }

    /// Validate a store key string.
    #[must_use]
    pub fn validate(key: &str) -> bool {
        !key.is_empty()
            && key
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
    }

    /// Extract a string slice of the underlying key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for StoreKey {
    type Error = StoreKeyError;

    fn try_from(key: &str) -> Result<Self, Self::Error> {
        Self::new(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_key_valid() {
        assert!(StoreKey::new("a").is_ok());
        assert!(StoreKey::new("a/b/c.json").is_ok());
        assert!(StoreKey::new("a/c/0.0.0").is_ok());
    }

    #[test]
    fn store_key_invalid() {
        assert!(StoreKey::new("").is_err());
        assert!(StoreKey::new("/a").is_err());
        assert!(StoreKey::new("a/").is_err());
        assert!(StoreKey::new("a//b").is_err());
        assert!(StoreKey::new("a/../b").is_err());
        assert!(StoreKey::new("./a").is_err());
    }
}
