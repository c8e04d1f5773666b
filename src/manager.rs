//! Driver resolution and session construction
//!
//! The manager resolves a configured driver name to a concrete handler
//! and wraps it in a [`Store`], plain or encrypted per configuration.
//! Custom driver factories registered at runtime are checked before the
//! built-ins, so user backends can shadow or extend them without
//! touching the crate.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::codec::{EncryptedCodec, PayloadCodec, PlainCodec};
use crate::config::SessionConfig;
use crate::encrypter::{AesGcmEncrypter, Encrypter};
use crate::error::SessionError;
use crate::handler::{
    DatabaseSessionHandler, FileSessionHandler, MemorySessionHandler, SessionHandler,
    SessionModel, SharedSessions,
};
use crate::store::Store;

#[cfg(feature = "redis-handler")]
use crate::handler::RedisSessionHandler;

type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<Arc<dyn SessionHandler>, SessionError>> + Send>>;

/// Asynchronous factory for a custom storage handler.
type HandlerCreator = Box<dyn Fn(&SessionConfig) -> HandlerFuture + Send + Sync>;

type ModelFuture =
    Pin<Box<dyn Future<Output = Result<Arc<dyn SessionModel>, SessionError>> + Send>>;

/// Asynchronous factory for the database driver's table model. Invoked
/// once per manager; the handshake (connect, ensure schema) lives here.
type ModelFactory = Box<dyn Fn() -> ModelFuture + Send + Sync>;

/// Builds stores bound to concrete handlers, by driver name.
pub struct SessionManager {
    config: SessionConfig,
    custom_creators: RwLock<HashMap<String, HandlerCreator>>,
    encrypter: RwLock<Option<Arc<dyn Encrypter>>>,
    /// Backing table for every memory handler this manager builds.
    memory_sessions: SharedSessions,
    model_factory: RwLock<Option<ModelFactory>>,
    session_model: Mutex<Option<Arc<dyn SessionModel>>>,
}

impl SessionManager {
    /// Create a manager for the given configuration, optionally with an
    /// injected encrypter for the encrypted-store case.
    pub fn new(config: SessionConfig, encrypter: Option<Arc<dyn Encrypter>>) -> Self {
        Self {
            config,
            custom_creators: RwLock::new(HashMap::new()),
            encrypter: RwLock::new(encrypter),
            memory_sessions: SharedSessions::default(),
            model_factory: RwLock::new(None),
            session_model: Mutex::new(None),
        }
    }

    /// The configured default driver name.
    pub fn default_driver(&self) -> &str {
        &self.config.driver
    }

    /// Resolve a driver name (default from configuration) and build a
    /// store bound to its handler. Unknown names with no registered
    /// factory fail with [`SessionError::DriverNotSupported`].
    pub async fn driver(&self, name: Option<&str>) -> Result<Store, SessionError> {
        let name = name.unwrap_or(&self.config.driver).to_string();

        let custom = {
            let creators = self.custom_creators.read();
            creators.get(&name).map(|create| create(&self.config))
        };

        let handler = match custom {
            Some(future) => future.await?,
            None => self.create_builtin(&name).await?,
        };

        Ok(self.build_session(handler))
    }

    /// Register a custom asynchronous handler factory, checked before
    /// the built-in drivers.
    pub fn register_handler<F, Fut>(&self, name: impl Into<String>, creator: F)
    where
        F: Fn(&SessionConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn SessionHandler>, SessionError>> + Send + 'static,
    {
        let boxed: HandlerCreator = Box::new(move |config| Box::pin(creator(config)));
        self.custom_creators.write().insert(name.into(), boxed);
    }

    /// Register the factory behind the `database` driver. The factory
    /// runs once; the resulting model is cached and shared by every
    /// database handler this manager builds.
    pub fn register_model<F, Fut>(&self, factory: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn SessionModel>, SessionError>> + Send + 'static,
    {
        let boxed: ModelFactory = Box::new(move || Box::pin(factory()));
        *self.model_factory.write() = Some(boxed);
    }

    /// Replace the encrypter used for subsequently built encrypted
    /// stores.
    pub fn set_encrypter(&self, encrypter: Arc<dyn Encrypter>) {
        *self.encrypter.write() = Some(encrypter);
    }

    async fn create_builtin(&self, name: &str) -> Result<Arc<dyn SessionHandler>, SessionError> {
        match name {
            "memory" => Ok(Arc::new(MemorySessionHandler::new(
                self.memory_sessions.clone(),
            ))),
            "file" | "native" => Ok(Arc::new(FileSessionHandler::new(self.config.files.clone()))),
            "database" => Ok(Arc::new(DatabaseSessionHandler::new(
                self.session_model().await?,
            ))),
            #[cfg(feature = "redis-handler")]
            "redis" => {
                let url = self.config.redis_url.as_deref().ok_or_else(|| {
                    SessionError::Config("redis driver requires redis_url".to_string())
                })?;
                Ok(Arc::new(
                    RedisSessionHandler::connect(url, self.config.lifetime_ms).await?,
                ))
            }
            other => Err(SessionError::DriverNotSupported(other.to_string())),
        }
    }

    async fn session_model(&self) -> Result<Arc<dyn SessionModel>, SessionError> {
        if let Some(model) = self.session_model.lock().clone() {
            return Ok(model);
        }

        let future = {
            let factory = self.model_factory.read();
            match factory.as_ref() {
                Some(factory) => factory(),
                None => {
                    return Err(SessionError::Config(
                        "database driver requires a session model factory".to_string(),
                    ))
                }
            }
        };

        let model = future.await?;
        // A concurrent first resolution may have won; keep whichever
        // landed first so all handlers share one model.
        let mut cached = self.session_model.lock();
        Ok(cached.get_or_insert_with(|| model).clone())
    }

    fn build_session(&self, handler: Arc<dyn SessionHandler>) -> Store {
        let codec: Arc<dyn PayloadCodec> = if self.config.encrypt {
            let encrypter = self
                .encrypter
                .read()
                .clone()
                .unwrap_or_else(|| Arc::new(AesGcmEncrypter::new(&self.config.secret)));
            Arc::new(EncryptedCodec::new(encrypter))
        } else {
            Arc::new(PlainCodec)
        };

        Store::new(self.config.cookie.clone(), handler, codec)
    }
}
