//! Canonical form of a thread lookup key.

/// A caller-chosen identifier for a user or session.
///
/// Integers and strings normalize to the same canonical string, so `111` and
/// `"111"` address the same thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey(String);

impl LookupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LookupKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LookupKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for LookupKey {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<i64> for LookupKey {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl std::str::FromStr for LookupKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}
