//! Host platform detection and the outcome of a platform-dispatched call.

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Cached platform of the running process.
static CURRENT: LazyLock<Platform> = LazyLock::new(|| Platform::from_name(std::env::consts::OS));

/// Operating system families the collectors know about.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    /// Any other platform, carrying its name as reported by the host.
    Unsupported(String),
}

impl Platform {
    /// Returns the platform of the running process.
    ///
    /// The result is cached after the first call.
    pub fn current() -> Platform {
        CURRENT.clone()
    }

    /// Maps a platform name to a known platform.
    ///
    /// Accepts the Rust target OS name (`linux`) and the historical `linux2`.
    pub fn from_name(name: &str) -> Platform {
        match name.trim().to_ascii_lowercase().as_str() {
            "linux" | "linux2" => Platform::Linux,
            _ => Platform::Unsupported(name.trim().to_string()),
        }
    }

    /// Whether a discovery backend exists for this platform.
    pub fn is_supported(&self) -> bool {
        matches!(self, Platform::Linux)
    }

    pub fn name(&self) -> &str {
        match self {
            Platform::Linux => "linux",
            Platform::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Outcome of a discovery call.
///
/// `Unsupported` is returned instead of an error when no backend exists for
/// the platform, so callers can still render a partial inventory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discovery<T> {
    Found(T),
    Unsupported(Platform),
}

impl<T> Discovery<T> {
    pub fn is_supported(&self) -> bool {
        matches!(self, Discovery::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Discovery::Found(value) => Some(value),
            Discovery::Unsupported(_) => None,
        }
    }

    pub fn as_ref(&self) -> Discovery<&T> {
        match self {
            Discovery::Found(value) => Discovery::Found(value),
            Discovery::Unsupported(platform) => Discovery::Unsupported(platform.clone()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Discovery<U> {
        match self {
            Discovery::Found(value) => Discovery::Found(f(value)),
            Discovery::Unsupported(platform) => Discovery::Unsupported(platform),
        }
    }
}

impl<T: Default> Discovery<T> {
    /// The found value, or the empty value of `T` on an unsupported platform.
    pub fn unwrap_or_default(self) -> T {
        self.found().unwrap_or_default()
    }
}

impl<T: Serialize> Serialize for Discovery<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Discovery::Found(value) => serializer.serialize_some(value),
            Discovery::Unsupported(_) => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Platform::from_name("linux"), Platform::Linux);
        assert_eq!(Platform::from_name("linux2"), Platform::Linux);
        assert_eq!(Platform::from_name("Linux\n"), Platform::Linux);
        assert_eq!(
            Platform::from_name("freebsd"),
            Platform::Unsupported("freebsd".to_string())
        );
        assert!(!Platform::from_name("windows").is_supported());
    }

    #[test]
    fn test_current_matches_target() {
        assert_eq!(Platform::current().is_supported(), cfg!(target_os = "linux"));
    }

    #[test]
    fn test_discovery_helpers() {
        let found: Discovery<u32> = Discovery::Found(4);
        assert!(found.is_supported());
        assert_eq!(found.clone().map(|v| v * 2), Discovery::Found(8));
        assert_eq!(found.found(), Some(4));

        let missing: Discovery<u32> = Discovery::Unsupported(Platform::from_name("darwin"));
        assert!(!missing.is_supported());
        assert_eq!(missing.as_ref().found(), None);
        assert_eq!(missing.unwrap_or_default(), 0);
    }

    #[test]
    fn test_discovery_serializes_unsupported_as_null() {
        let missing: Discovery<u32> = Discovery::Unsupported(Platform::from_name("darwin"));
        assert_eq!(serde_json::to_string(&missing).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Discovery::Found(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&Platform::Linux).unwrap(), "\"linux\"");
    }
}
