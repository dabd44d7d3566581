//! Session manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use stash_store::MEMORY_PROVIDER;

use crate::ManagerError;

/// Cookie name used when none is configured.
pub const DEFAULT_COOKIE_NAME: &str = "stash_sid";

/// Idle timeout used when none is configured: one hour.
pub const DEFAULT_MAX_IDLE_SECS: u64 = 3600;

/// Everything a [`SessionManager`](crate::SessionManager) needs to know.
///
/// Deserializable, so it can come straight out of an application's config
/// file; missing fields fall back to the defaults.
///
/// ```rust
/// use stash_manager::ManagerConfig;
///
/// let config = ManagerConfig::default()
///     .cookie_name("app_session")
///     .max_idle_secs(900);
/// assert_eq!(config.gc_interval().as_secs(), 900);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Registry name of the provider to use.
    pub provider: String,

    /// Name of the cookie that carries the session id.
    pub cookie_name: String,

    /// Seconds a session may go without a write before it is evicted.
    /// Also sent to the client as the cookie's `Max-Age`.
    pub max_idle_secs: u64,

    /// Seconds between reclamation passes. `None` means "same as
    /// `max_idle_secs`".
    pub gc_interval_secs: Option<u64>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            provider: MEMORY_PROVIDER.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_idle_secs: DEFAULT_MAX_IDLE_SECS,
            gc_interval_secs: None,
        }
    }
}

impl ManagerConfig {
    /// A config naming all three registration-time settings.
    pub fn new(
        provider: impl Into<String>,
        cookie_name: impl Into<String>,
        max_idle_secs: u64,
    ) -> Self {
        Self {
            provider: provider.into(),
            cookie_name: cookie_name.into(),
            max_idle_secs,
            gc_interval_secs: None,
        }
    }

    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.provider = name.into();
        self
    }

    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn max_idle_secs(mut self, secs: u64) -> Self {
        self.max_idle_secs = secs;
        self
    }

    pub fn gc_interval_secs(mut self, secs: u64) -> Self {
        self.gc_interval_secs = Some(secs);
        self
    }

    /// The idle timeout as a `Duration`.
    pub fn max_idle(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }

    /// Time between reclamation passes.
    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs.unwrap_or(self.max_idle_secs))
    }

    /// Rejects settings that would break the cookie or the reclamation
    /// loop.
    ///
    /// # Errors
    /// [`ManagerError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ManagerError> {
        if self.provider.is_empty() {
            return Err(ManagerError::InvalidConfig(
                "provider name is empty".into(),
            ));
        }
        if !is_cookie_token(&self.cookie_name) {
            return Err(ManagerError::InvalidConfig(format!(
                "cookie name {:?} is not a valid token",
                self.cookie_name
            )));
        }
        if self.max_idle_secs == 0 {
            return Err(ManagerError::InvalidConfig(
                "max_idle_secs must be greater than zero".into(),
            ));
        }
        if self.gc_interval_secs == Some(0) {
            return Err(ManagerError::InvalidConfig(
                "gc_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// RFC 6265 cookie-name: a non-empty HTTP token (visible ASCII minus
/// separators).
fn is_cookie_token(name: &str) -> bool {
    const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={} \t";
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !SEPARATORS.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();
        assert_eq!(config.provider, "memory");
        assert_eq!(config.cookie_name, DEFAULT_COOKIE_NAME);
        assert_eq!(config.max_idle_secs, 3600);
        assert_eq!(config.gc_interval(), Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gc_interval_override() {
        let config = ManagerConfig::new("memory", "sid", 600).gc_interval_secs(30);
        assert_eq!(config.max_idle(), Duration::from_secs(600));
        assert_eq!(config.gc_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_zero_idle() {
        let config = ManagerConfig::default().max_idle_secs(0);
        assert!(matches!(
            config.validate(),
            Err(ManagerError::InvalidConfig(msg)) if msg.contains("max_idle_secs")
        ));
    }

    #[test]
    fn test_validate_rejects_zero_gc_interval() {
        let config = ManagerConfig::default().gc_interval_secs(0);
        assert!(matches!(config.validate(), Err(ManagerError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_cookie_names() {
        for name in ["", "has space", "semi;colon", "eq=uals", "ünï"] {
            let config = ManagerConfig::default().cookie_name(name);
            assert!(
                matches!(config.validate(), Err(ManagerError::InvalidConfig(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_empty_provider() {
        let config = ManagerConfig::default().provider("");
        assert!(matches!(config.validate(), Err(ManagerError::InvalidConfig(_))));
    }

    #[test]
    fn test_deserialize_partial_json_uses_defaults() {
        let config: ManagerConfig =
            serde_json::from_str(r#"{ "cookie_name": "gosid", "max_idle_secs": 60 }"#)
                .expect("valid config");
        assert_eq!(config.provider, "memory");
        assert_eq!(config.cookie_name, "gosid");
        assert_eq!(config.max_idle_secs, 60);
        assert_eq!(config.gc_interval_secs, None);
    }
}
