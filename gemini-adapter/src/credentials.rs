//! API-key discovery and the rotating credential pool.

use crate::error::GeminiError;

/// Environment variable holding a comma-separated list of API keys.
pub const API_KEYS_ENV_VAR: &str = "GEMINI_API_KEYS";

/// Environment variable holding a single API key.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

/// An opaque API key and its position in the pool.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    index: usize,
    key: String,
}

impl Credential {
    /// Position of this credential in its pool.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The raw key. Never log this.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("index", &self.index)
            .field("key", &"***")
            .finish()
    }
}

/// Ordered, non-empty set of interchangeable credentials with a rotation pointer.
///
/// Exactly one credential is current at any time. Only [`CredentialPool::rotate`]
/// moves the pointer.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    current: usize,
}

impl CredentialPool {
    /// Builds a pool from keys, dropping blanks.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::NoCredentials` if no non-blank key is given.
    pub fn new<I, S>(keys: I) -> Result<Self, GeminiError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials: Vec<Credential> = keys
            .into_iter()
            .map(Into::into)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .enumerate()
            .map(|(index, key)| Credential { index, key })
            .collect();

        if credentials.is_empty() {
            return Err(GeminiError::NoCredentials(
                "credential pool requires at least one key".to_string(),
            ));
        }

        Ok(Self {
            credentials,
            current: 0,
        })
    }

    /// The active credential.
    #[must_use]
    pub fn current(&self) -> &Credential {
        &self.credentials[self.current]
    }

    /// Advances to the next credential (cyclically) and returns it.
    pub fn rotate(&mut self) -> &Credential {
        self.current = (self.current + 1) % self.credentials.len();
        tracing::info!(
            key_index = self.current,
            pool_size = self.credentials.len(),
            "Switched API key"
        );
        &self.credentials[self.current]
    }

    /// Index of the active credential.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.current
    }

    /// Number of credentials in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always `false`; a pool cannot be constructed empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

/// Splits a comma- or whitespace-separated key list.
#[must_use]
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Locates API keys.
///
/// Resolution order:
/// 1. `explicit` if non-empty.
/// 2. The keys listed in the `GEMINI_API_KEYS` environment variable.
/// 3. The single key in the `GEMINI_API_KEY` environment variable.
///
/// # Errors
///
/// Returns `GeminiError::NoCredentials` when no key can be found.
pub fn discover_api_keys(explicit: Vec<String>) -> Result<Vec<String>, GeminiError> {
    let explicit: Vec<String> = explicit
        .iter()
        .flat_map(|k| parse_key_list(k))
        .collect();
    if !explicit.is_empty() {
        return Ok(explicit);
    }

    if let Ok(raw) = std::env::var(API_KEYS_ENV_VAR) {
        let keys = parse_key_list(&raw);
        if !keys.is_empty() {
            return Ok(keys);
        }
    }

    if let Ok(raw) = std::env::var(API_KEY_ENV_VAR) {
        let key = raw.trim();
        if !key.is_empty() {
            return Ok(vec![key.to_string()]);
        }
    }

    Err(GeminiError::NoCredentials(format!(
        "pass --api-keys or set {API_KEYS_ENV_VAR} / {API_KEY_ENV_VAR}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_rejected() {
        let err = CredentialPool::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, GeminiError::NoCredentials(_)));

        let blanks = CredentialPool::new(["", "  "]);
        assert!(blanks.is_err());
    }

    #[test]
    fn test_rotate_full_cycle_returns_to_start() {
        let mut pool = CredentialPool::new(["a", "b", "c"]).unwrap();
        let start = pool.index();

        for _ in 0..pool.len() {
            pool.rotate();
        }

        assert_eq!(pool.index(), start);
        assert_eq!(pool.current().key(), "a");
    }

    #[test]
    fn test_rotate_advances_current() {
        let mut pool = CredentialPool::new(["a", "b"]).unwrap();
        assert_eq!(pool.current().key(), "a");
        assert_eq!(pool.rotate().key(), "b");
        assert_eq!(pool.current().index(), 1);
        assert_eq!(pool.rotate().key(), "a");
    }

    #[test]
    fn test_single_key_rotation_is_stable() {
        let mut pool = CredentialPool::new(["only"]).unwrap();
        pool.rotate();
        assert_eq!(pool.current().key(), "only");
        assert_eq!(pool.index(), 0);
    }

    #[test]
    fn test_debug_redacts_key() {
        let pool = CredentialPool::new(["super-secret"]).unwrap();
        let debug = format!("{pool:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_parse_key_list() {
        assert_eq!(parse_key_list("a, b,,c d"), vec!["a", "b", "c", "d"]);
        assert!(parse_key_list(" , ").is_empty());
    }

    #[test]
    fn test_explicit_keys_win() {
        let keys = discover_api_keys(vec!["k1,k2".to_string(), "k3".to_string()]).unwrap();
        assert_eq!(keys, vec!["k1", "k2", "k3"]);
    }
}
