//! # session-kit
//!
//! Framework-agnostic server-side session management.
//!
//! A session is an identity issued to an HTTP client through a signed
//! cookie plus an attribute bag persisted across requests by a pluggable
//! storage handler. On top of that sit the lifecycle policies: CSRF
//! token rotation, flash-data aging, optional at-rest encryption and a
//! lottery-based garbage collector.
//!
//! ## Features
//!
//! - **Signed cookies**: `s:`-prefixed HMAC-SHA256 signatures; tampered
//!   cookies silently fall back to a fresh session
//! - **Pluggable storage**: memory, file and table-backed handlers are
//!   built in, custom backends register at runtime
//! - **Dot-path attributes**: `session.set("user.profile.name", "bob")`
//! - **Flash data**: values that live for exactly one more request
//! - **At-rest encryption**: AES-256-GCM around the serialized payload,
//!   invisible to the storage handler
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use session_kit::{CookieJar, SessionConfig, SessionService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), session_kit::SessionError> {
//!     let config = SessionConfig::new("your-secret-key").with_driver("memory");
//!     let service = SessionService::new(config)?;
//!
//!     // Per request: open from the Cookie header, mutate, close.
//!     let mut session = service.open(request_cookie_header()).await?;
//!     let views: i32 = session.get("views").unwrap_or(0);
//!     session.set("views", views + 1);
//!
//!     let mut jar = CookieJar::new();
//!     service.close(&mut session, &mut jar).await?;
//!     // jar.headers() now holds the Set-Cookie values for the response.
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod cookie;
pub mod encrypter;
pub mod error;
pub mod handler;
pub mod manager;
pub mod service;
pub mod sid;
pub mod store;

mod util;

pub use codec::{EncryptedCodec, PayloadCodec, PlainCodec};
pub use config::SessionConfig;
pub use cookie::{CookieJar, CookieOptions};
pub use encrypter::{AesGcmEncrypter, Encrypter};
pub use error::SessionError;
pub use handler::{
    DatabaseSessionHandler, FileSessionHandler, MemorySessionHandler, SessionHandler,
    SessionModel, SessionRecord,
};
pub use manager::SessionManager;
pub use service::SessionService;
pub use store::{LoadOutcome, Store};

#[cfg(feature = "redis-handler")]
pub use handler::RedisSessionHandler;
