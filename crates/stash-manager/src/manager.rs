//! The session manager.
//!
//! A [`SessionManager`] is bound to one provider, one cookie name and one
//! idle timeout. For each request it either resumes the session named by
//! the cookie or starts a new one and tells the client about it.
//!
//! # Lifecycle
//!
//! ```text
//! request without cookie ──start──> new id, new session, Set-Cookie
//! request with cookie    ──start──> session for that id (created if gone)
//! request with cookie    ──stop───> session removed, cookie expired
//! every gc interval      ──gc─────> sessions idle ≥ max_idle evicted
//! ```
//!
//! `start`, `stop` and the periodic gc are serialized on one manager-wide
//! lock. Reads and writes on a session handle never take it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use stash_cookie::{
    path_escape, CookieSink, CookieSource, OsRandomIds, SessionIdSource, SetCookie,
};
use stash_reaper::{Reaper, ReaperConfig, ReaperHandle, ReaperStats};
use stash_store::{Provider, SessionRef};
use tracing::{debug, error, info};

use crate::{ManagerConfig, ManagerError, ProviderRegistry};

/// State shared between the manager and its reclamation task.
struct Shared {
    provider_name: String,
    provider: Arc<dyn Provider>,
    config: ManagerConfig,
    ids: Box<dyn SessionIdSource>,
    lock: Mutex<()>,
}

impl Shared {
    fn gc(&self) -> Vec<String> {
        let _guard = self.lock.lock();
        let evicted = self.provider.gc(self.config.max_idle());
        if !evicted.is_empty() {
            info!(
                provider = %self.provider_name,
                evicted = evicted.len(),
                "idle sessions evicted"
            );
        }
        evicted
    }
}

/// Starts, resumes and stops cookie-bound sessions.
///
/// Creating a manager also starts its reclamation loop on the current
/// Tokio runtime. The loop runs until [`shutdown`](Self::shutdown) is
/// called or the manager is dropped.
///
/// ```rust,ignore
/// let registry = ProviderRegistry::with_defaults();
/// let manager = SessionManager::new(&registry, ManagerConfig::default())?;
///
/// let session = manager.start(&request_cookies, &mut response_cookies)?;
/// session.insert("user", "ada".to_string())?;
/// ```
pub struct SessionManager {
    shared: Arc<Shared>,
    reaper: ReaperHandle,
}

impl SessionManager {
    /// Creates a manager over the provider named in `config`, generating
    /// ids from the operating system's random source.
    ///
    /// # Errors
    /// - [`ManagerError::InvalidConfig`] if `config` doesn't validate
    /// - [`ManagerError::UnknownProvider`] if the registry has no such
    ///   provider
    /// - [`ManagerError::Reaper`] if there's no Tokio runtime
    pub fn new(registry: &ProviderRegistry, config: ManagerConfig) -> Result<Self, ManagerError> {
        Self::with_id_source(registry, config, OsRandomIds)
    }

    /// Like [`new`](Self::new), with a custom id source.
    pub fn with_id_source<I: SessionIdSource>(
        registry: &ProviderRegistry,
        config: ManagerConfig,
        ids: I,
    ) -> Result<Self, ManagerError> {
        config.validate()?;

        let Some(provider) = registry.get(&config.provider) else {
            error!(
                provider = %config.provider,
                known = ?registry.names(),
                "unknown session provider"
            );
            return Err(ManagerError::UnknownProvider(config.provider));
        };

        let reaper_config = ReaperConfig::every(config.gc_interval());
        let shared = Arc::new(Shared {
            provider_name: config.provider.clone(),
            provider,
            config,
            ids: Box::new(ids),
            lock: Mutex::new(()),
        });

        let sweeper = Arc::clone(&shared);
        let reaper = Reaper::spawn(reaper_config, move || sweeper.gc().len())?;

        info!(
            provider = %shared.provider_name,
            cookie = %shared.config.cookie_name,
            max_idle_secs = shared.config.max_idle_secs,
            "session manager started"
        );

        Ok(Self { shared, reaper })
    }

    // -----------------------------------------------------------------------
    // Request operations
    // -----------------------------------------------------------------------

    /// Returns the session for this request, starting one if needed.
    ///
    /// With no (or an empty) session cookie, a fresh id is generated, the
    /// provider creates its session, and a cookie carrying the id is added
    /// to `response`. With a cookie, its value is path-escaped and handed
    /// to the provider, which returns the live session or creates a new
    /// one under that id; `response` is left alone.
    ///
    /// # Errors
    /// - [`ManagerError::IdGeneration`] if no id could be generated
    /// - [`ManagerError::Store`] if the provider refuses
    ///
    /// In both cases no cookie is set.
    pub fn start<R, W>(&self, request: &R, response: &mut W) -> Result<SessionRef, ManagerError>
    where
        R: CookieSource + ?Sized,
        W: CookieSink + ?Sized,
    {
        let cookie_name = &self.shared.config.cookie_name;
        let _guard = self.shared.lock.lock();

        match request.cookie(cookie_name).filter(|v| !v.is_empty()) {
            Some(raw) => {
                let sid = path_escape(&raw);
                let session = self.shared.provider.read(&sid)?;
                Ok(session)
            }
            None => {
                let sid = self.shared.ids.generate()?;
                let session = self.shared.provider.read(&sid)?;
                response.set_cookie(SetCookie::session(
                    cookie_name.as_str(),
                    sid,
                    self.shared.config.max_idle_secs,
                ));
                debug!(cookie = %cookie_name, "new session started");
                Ok(session)
            }
        }
    }

    /// Ends the request's session, if it has one.
    ///
    /// Removes the session from the provider and adds an already-expired
    /// cookie to `response` so the client forgets the id. Without a
    /// session cookie this does nothing.
    ///
    /// # Errors
    /// [`ManagerError::Store`] if the provider fails to remove the session.
    pub fn stop<R, W>(&self, request: &R, response: &mut W) -> Result<(), ManagerError>
    where
        R: CookieSource + ?Sized,
        W: CookieSink + ?Sized,
    {
        let cookie_name = &self.shared.config.cookie_name;
        let Some(raw) = request.cookie(cookie_name).filter(|v| !v.is_empty()) else {
            return Ok(());
        };

        let _guard = self.shared.lock.lock();
        self.shared.provider.remove(&path_escape(&raw))?;
        response.set_cookie(SetCookie::expired(cookie_name.as_str()));
        debug!(cookie = %cookie_name, "session stopped");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reclamation
    // -----------------------------------------------------------------------

    /// Runs one reclamation pass now and returns the evicted ids.
    pub fn gc_now(&self) -> Vec<String> {
        self.shared.gc()
    }

    /// Stops the reclamation loop and waits for it to finish. Sessions
    /// already stored are left as they are.
    pub async fn shutdown(&mut self) {
        self.reaper.shutdown().await;
        info!(provider = %self.shared.provider_name, "session manager stopped");
    }

    /// `true` while the reclamation loop is running.
    pub fn is_running(&self) -> bool {
        self.reaper.is_running()
    }

    pub fn reaper_stats(&self) -> &ReaperStats {
        self.reaper.stats()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    pub fn cookie_name(&self) -> &str {
        &self.shared.config.cookie_name
    }

    pub fn max_idle(&self) -> Duration {
        self.shared.config.max_idle()
    }

    pub fn provider_name(&self) -> &str {
        &self.shared.provider_name
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.shared.provider
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("provider", &self.shared.provider_name)
            .field("config", &self.shared.config)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use stash_cookie::{RequestCookies, ResponseCookies, SESSION_ID_LEN};

    use super::*;

    fn manager(config: ManagerConfig) -> SessionManager {
        SessionManager::new(&ProviderRegistry::with_defaults(), config).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_cookie_sets_cookie() {
        let manager = manager(ManagerConfig::new("memory", "sid", 120));
        let mut response = ResponseCookies::new();

        let session = manager.start(&RequestCookies::new(), &mut response).unwrap();

        let cookie = response.get("sid").expect("cookie set");
        assert_eq!(cookie.value, session.id());
        assert_eq!(cookie.value.len(), SESSION_ID_LEN);
        assert_eq!(cookie.max_age, Some(120));
        assert!(cookie.http_only);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_without_cookie_is_noop() {
        let manager = manager(ManagerConfig::default());
        let mut response = ResponseCookies::new();

        manager.stop(&RequestCookies::new(), &mut response).unwrap();

        assert!(response.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_provider_rejected() {
        let err = SessionManager::new(
            &ProviderRegistry::with_defaults(),
            ManagerConfig::default().provider("redis"),
        )
        .unwrap_err();
        assert!(matches!(err, ManagerError::UnknownProvider(ref p) if p == "redis"));
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let err = SessionManager::new(&ProviderRegistry::with_defaults(), ManagerConfig::default())
            .unwrap_err();
        assert!(matches!(err, ManagerError::Reaper(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_loop() {
        let mut manager = manager(ManagerConfig::default());
        assert!(manager.is_running());

        manager.shutdown().await;

        assert!(!manager.is_running());
    }
}
