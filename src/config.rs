//! Session configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::error::SessionError;

/// Configuration consumed by the session manager and service.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Driver name resolved by the manager (default: "file")
    pub driver: String,

    /// Session lifetime in milliseconds (default: 5 minutes).
    /// Drives the cookie Max-Age and the garbage collector's cutoff.
    pub lifetime_ms: u64,

    /// When true the session cookie carries no Max-Age and dies with the
    /// browser (default: false)
    pub expire_on_close: bool,

    /// Directory for the file driver (default: "./sessions")
    pub files: PathBuf,

    /// Garbage-collection lottery odds as [numerator, denominator]
    /// (default: [2, 100], a 2% chance per request)
    pub lottery: [u32; 2],

    /// Name of the session cookie (default: "session_kit")
    pub cookie: String,

    /// Cookie path (default: "/")
    pub path: String,

    /// Cookie domain (default: None - current domain only)
    pub domain: Option<String>,

    /// Secure flag for the cookie (default: false)
    pub secure: bool,

    /// HttpOnly flag for the cookie (default: true)
    pub http_only: bool,

    /// Encrypt session payloads at rest (default: false)
    pub encrypt: bool,

    /// Signing/encryption key. Required; an empty secret fails
    /// validation.
    pub secret: String,

    /// Connection URL for the redis driver
    #[cfg(feature = "redis-handler")]
    pub redis_url: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            driver: "file".to_string(),
            lifetime_ms: 300_000,
            expire_on_close: false,
            files: PathBuf::from("./sessions"),
            lottery: [2, 100],
            cookie: "session_kit".to_string(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
            encrypt: false,
            secret: String::new(),
            #[cfg(feature = "redis-handler")]
            redis_url: None,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with the given signing secret.
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Set the driver name (default: "file")
    pub fn with_driver<S: Into<String>>(mut self, driver: S) -> Self {
        self.driver = driver.into();
        self
    }

    /// Set the session lifetime in milliseconds
    pub fn with_lifetime_ms(mut self, lifetime_ms: u64) -> Self {
        self.lifetime_ms = lifetime_ms;
        self
    }

    /// Set the session lifetime from a Duration
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime_ms = lifetime.as_millis() as u64;
        self
    }

    /// Make the session cookie expire when the browser closes
    pub fn with_expire_on_close(mut self, expire_on_close: bool) -> Self {
        self.expire_on_close = expire_on_close;
        self
    }

    /// Set the directory used by the file driver
    pub fn with_files<P: Into<PathBuf>>(mut self, files: P) -> Self {
        self.files = files.into();
        self
    }

    /// Set the garbage-collection lottery odds
    pub fn with_lottery(mut self, numerator: u32, denominator: u32) -> Self {
        self.lottery = [numerator, denominator];
        self
    }

    /// Set the session cookie name (default: "session_kit")
    pub fn with_cookie_name<S: Into<String>>(mut self, cookie: S) -> Self {
        self.cookie = cookie.into();
        self
    }

    /// Set the cookie path (default: "/")
    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = path.into();
        self
    }

    /// Set the cookie domain
    pub fn with_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the Secure flag (default: false)
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the HttpOnly flag (default: true)
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Enable payload encryption at rest
    pub fn with_encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    /// Set the redis connection URL for the redis driver
    #[cfg(feature = "redis-handler")]
    pub fn with_redis_url<S: Into<String>>(mut self, url: S) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Validate the configuration. Fatal problems surface here, before
    /// any session is built.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.secret.is_empty() {
            return Err(SessionError::Config(
                "secret option required for sessions".to_string(),
            ));
        }
        if self.lottery[1] == 0 {
            return Err(SessionError::Config(
                "lottery denominator must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Cookie lifetime in milliseconds; `None` means a browser-session
    /// cookie (no Max-Age on the wire).
    pub fn cookie_lifetime_ms(&self) -> Option<u64> {
        if self.expire_on_close {
            None
        } else {
            Some(self.lifetime_ms)
        }
    }
}
