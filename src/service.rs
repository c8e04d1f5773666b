//! Request-level session coordination
//!
//! [`SessionService`] is the piece the HTTP integration layer talks to:
//! it turns an inbound `Cookie` header into a started [`Store`], and at
//! response completion saves the store, runs the garbage-collection
//! lottery and emits the signed session cookie. It works on header
//! strings so any framework adapter can sit on top.
//!
//! The integration layer owns the at-most-once guarantee: `close` must
//! run exactly once per request even when the response finalizes early
//! or repeatedly.

use std::sync::Arc;

use rand::Rng;

use crate::config::SessionConfig;
use crate::cookie::{self, CookieJar, CookieOptions};
use crate::encrypter::Encrypter;
use crate::error::SessionError;
use crate::manager::SessionManager;
use crate::store::Store;

/// Top-level session coordinator.
pub struct SessionService {
    config: SessionConfig,
    manager: SessionManager,
}

impl SessionService {
    /// Create a service for the given configuration.
    ///
    /// Configuration problems (missing secret, zero lottery denominator)
    /// are fatal here, before any request is served.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let manager = SessionManager::new(config.clone(), None);
        Ok(Self { config, manager })
    }

    /// The manager, for registering custom drivers or a database model.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Replace the encrypter used for encrypted stores.
    pub fn set_encrypter(&self, encrypter: Arc<dyn Encrypter>) {
        self.manager.set_encrypter(encrypter);
    }

    /// Open the session for an inbound request.
    ///
    /// The candidate id comes from the signed session cookie in the
    /// given `Cookie` header; a missing cookie, bad signature or invalid
    /// id silently yields a fresh session. The returned store is
    /// started.
    pub async fn open(&self, cookie_header: Option<&str>) -> Result<Store, SessionError> {
        let mut store = self.manager.driver(None).await?;
        store.set_id(self.session_id_from_header(cookie_header).as_deref());
        store.start().await;
        Ok(store)
    }

    /// Close the session at response completion: save it, maybe collect
    /// garbage, and append the signed session cookie to the jar.
    ///
    /// Garbage collection is fire-and-forget; the response never waits
    /// for it.
    pub async fn close(&self, store: &mut Store, jar: &mut CookieJar) -> Result<(), SessionError> {
        store.save().await?;
        self.collect_garbage(store);
        jar.add(self.session_cookie(store));
        Ok(())
    }

    /// Extract and unsign the session id from a `Cookie` header.
    fn session_id_from_header(&self, header: Option<&str>) -> Option<String> {
        let cookies = cookie::parse_cookie_header(header?);
        let raw = cookies.get(&self.config.cookie)?;
        let id = cookie::unsign(raw, &self.config.secret);
        if id.is_none() {
            tracing::debug!("session cookie signature invalid, starting fresh");
        }
        id
    }

    /// Serialize the signed session cookie for the response.
    fn session_cookie(&self, store: &Store) -> String {
        let signed = cookie::sign(store.id(), &self.config.secret);
        let options = CookieOptions {
            path: Some(self.config.path.clone()),
            domain: self.config.domain.clone(),
            secure: self.config.secure,
            http_only: self.config.http_only,
            max_age_ms: self.config.cookie_lifetime_ms(),
            expires: None,
        };
        cookie::serialize_cookie(store.name(), &signed, &options)
    }

    /// Run the garbage-collection lottery: with odds `[n, d]`, a uniform
    /// draw in `[1, d]` at or below `n` triggers the handler's `gc` on a
    /// spawned task.
    fn collect_garbage(&self, store: &Store) {
        if !self.hits_lottery() {
            return;
        }

        let handler = store.handler();
        let max_age_ms = self.config.lifetime_ms;
        tokio::spawn(async move {
            handler.gc(max_age_ms).await;
        });
    }

    fn hits_lottery(&self) -> bool {
        let [numerator, denominator] = self.config.lottery;
        rand::thread_rng().gen_range(1..=denominator) <= numerator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{MemorySessionHandler, SessionHandler, SharedSessions};
    use crate::sid;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn service(config: SessionConfig) -> SessionService {
        let service = SessionService::new(config).unwrap();
        let sessions = SharedSessions::default();
        service.manager().register_handler("test", move |_config| {
            let sessions = sessions.clone();
            async move {
                Ok(Arc::new(MemorySessionHandler::new(sessions)) as Arc<dyn SessionHandler>)
            }
        });
        service
    }

    fn test_config() -> SessionConfig {
        SessionConfig::new("keyboard cat").with_driver("test")
    }

    #[test]
    fn missing_secret_is_fatal_at_construction() {
        assert!(SessionService::new(SessionConfig::default()).is_err());
    }

    #[tokio::test]
    async fn open_without_cookie_starts_fresh_session() {
        let service = service(test_config());
        let store = service.open(None).await.unwrap();
        assert!(store.started());
        assert!(sid::is_valid(store.id()));
        assert!(store.token().is_some());
    }

    #[tokio::test]
    async fn round_trip_through_cookie_header() {
        let service = service(test_config());

        let mut store = service.open(None).await.unwrap();
        store.set("user", "bob");
        let id = store.id().to_string();

        let mut jar = CookieJar::new();
        service.close(&mut store, &mut jar).await.unwrap();

        let set_cookie = &jar.headers()[0];
        assert!(set_cookie.starts_with("session_kit="));
        assert!(set_cookie.contains("; HttpOnly"));
        assert!(set_cookie.contains("; Max-Age=300"));

        // Replay the cookie the way a browser would.
        let cookie_pair = set_cookie.split(';').next().unwrap();
        let store = service.open(Some(cookie_pair)).await.unwrap();
        assert_eq!(store.id(), id);
        assert_eq!(store.get::<String>("user"), Some("bob".to_string()));
    }

    #[tokio::test]
    async fn tampered_cookie_yields_fresh_session() {
        let service = service(test_config());

        let mut store = service.open(None).await.unwrap();
        let id = store.id().to_string();
        let mut jar = CookieJar::new();
        service.close(&mut store, &mut jar).await.unwrap();

        let forged = format!(
            "session_kit={}",
            urlencoding::encode(&cookie::sign(&id, "wrong secret"))
        );
        let store = service.open(Some(&forged)).await.unwrap();
        assert_ne!(store.id(), id);
    }

    #[tokio::test]
    async fn invalid_session_id_in_valid_cookie_is_replaced() {
        let service = service(test_config());
        let signed = cookie::sign("not-a-valid-id", "keyboard cat");
        let header = format!("session_kit={}", urlencoding::encode(&signed));

        let store = service.open(Some(&header)).await.unwrap();
        assert_ne!(store.id(), "not-a-valid-id");
        assert!(sid::is_valid(store.id()));
    }

    #[tokio::test]
    async fn expire_on_close_omits_max_age() {
        let service = service(test_config().with_expire_on_close(true));
        let mut store = service.open(None).await.unwrap();
        let mut jar = CookieJar::new();
        service.close(&mut store, &mut jar).await.unwrap();

        let set_cookie = &jar.headers()[0];
        assert!(!set_cookie.contains("Max-Age"));
        assert!(!set_cookie.contains("Expires"));
    }

    /// Handler that counts gc invocations.
    struct GcCountingHandler {
        inner: MemorySessionHandler,
        gcs: Arc<AtomicU32>,
    }

    #[async_trait]
    impl SessionHandler for GcCountingHandler {
        async fn read(&self, session_id: &str) -> String {
            self.inner.read(session_id).await
        }

        async fn write(&self, session_id: &str, payload: &str) -> Result<(), SessionError> {
            self.inner.write(session_id, payload).await
        }

        async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
            self.inner.destroy(session_id).await
        }

        async fn gc(&self, _max_age_ms: u64) {
            self.gcs.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn run_lottery_trials(numerator: u32, trials: u32) -> u32 {
        let config = SessionConfig::new("keyboard cat")
            .with_driver("counting")
            .with_lottery(numerator, 100);
        let service = SessionService::new(config).unwrap();
        let gcs = Arc::new(AtomicU32::new(0));
        let counter = gcs.clone();
        service
            .manager()
            .register_handler("counting", move |_config| {
                let gcs = counter.clone();
                async move {
                    Ok(Arc::new(GcCountingHandler {
                        inner: MemorySessionHandler::new(SharedSessions::default()),
                        gcs,
                    }) as Arc<dyn SessionHandler>)
                }
            });

        for _ in 0..trials {
            let mut store = service.open(None).await.unwrap();
            let mut jar = CookieJar::new();
            service.close(&mut store, &mut jar).await.unwrap();
        }

        // Let the spawned gc tasks settle.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        gcs.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn certain_lottery_always_collects() {
        assert_eq!(run_lottery_trials(100, 1000).await, 1000);
    }

    #[tokio::test]
    async fn impossible_lottery_never_collects() {
        assert_eq!(run_lottery_trials(0, 1000).await, 0);
    }
}
