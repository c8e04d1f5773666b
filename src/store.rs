//! The session store
//!
//! A [`Store`] owns the attribute bag for one session across one
//! request: it is built, `start`ed (load-or-initialize), mutated freely,
//! `save`d once when the response completes, and discarded. Only the
//! serialized payload and the session id outlive it, through the
//! handler.
//!
//! Attribute keys are dot-paths: `"a.b.c"` addresses nested objects and
//! writing through a path creates the levels it needs. Two reserved
//! areas live alongside user data: the `_token` CSRF token and the
//! `flash.old`/`flash.new` bookkeeping lists for two-generation flash
//! aging.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::codec::PayloadCodec;
use crate::error::SessionError;
use crate::handler::SessionHandler;
use crate::util::{dot_get, dot_set, merge_keep_existing};
use crate::sid;

/// CSRF token attribute key.
const TOKEN_KEY: &str = "_token";

/// Flash keys staged for removal by the next aging pass.
const FLASH_OLD: &str = "flash.old";

/// Flash keys added during the current cycle.
const FLASH_NEW: &str = "flash.new";

/// Attribute key for flashed request input.
const OLD_INPUT_KEY: &str = "_old_input";

/// How a `start` resolved against storage.
///
/// Corruption (unparseable or undecryptable payloads) degrades to an
/// empty session by policy; this tag keeps that case distinguishable
/// from a genuinely absent session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No payload existed for this id
    Fresh,
    /// A payload was found and merged into the attribute bag
    Restored,
    /// A payload existed but could not be decoded; the session starts
    /// empty
    CorruptDegradedToFresh,
}

/// Session state plus lifecycle operations, bound to one handler for its
/// whole life.
pub struct Store {
    id: String,
    name: String,
    attributes: Map<String, Value>,
    started: bool,
    handler: Arc<dyn SessionHandler>,
    codec: Arc<dyn PayloadCodec>,
}

impl Store {
    /// Create a session bound to a cookie name and a handler. The id
    /// starts out freshly generated; adopt a client-supplied candidate
    /// with [`Store::set_id`].
    pub fn new(
        name: impl Into<String>,
        handler: Arc<dyn SessionHandler>,
        codec: Arc<dyn PayloadCodec>,
    ) -> Self {
        Self {
            id: sid::generate(),
            name: name.into(),
            attributes: Map::new(),
            started: false,
            handler,
            codec,
        }
    }

    /// The session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The cookie name this session is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the session is between `start` and `save`.
    pub fn started(&self) -> bool {
        self.started
    }

    /// The handler this store persists through.
    pub fn handler(&self) -> Arc<dyn SessionHandler> {
        Arc::clone(&self.handler)
    }

    /// Adopt a candidate session id, or generate a fresh one when the
    /// candidate is absent or fails validation. Untrusted input ends up
    /// here; nothing invalid ever becomes the session id.
    pub fn set_id(&mut self, candidate: Option<&str>) {
        self.id = match candidate {
            Some(id) if sid::is_valid(id) => id.to_string(),
            _ => sid::generate(),
        };
    }

    /// Load the session from the handler and mark it started.
    ///
    /// A missing payload starts a fresh session; a corrupt one is
    /// silently discarded ("no session" policy) with the outcome tag
    /// saying so. The CSRF token is regenerated whenever absent after
    /// load. Attribute values already set in memory win over incoming
    /// ones.
    pub async fn start(&mut self) -> LoadOutcome {
        let outcome = self.load_session().await;

        if self.token().is_none() {
            self.regenerate_token();
        }
        self.started = true;

        outcome
    }

    async fn load_session(&mut self) -> LoadOutcome {
        let raw = self.handler.read(&self.id).await;
        if raw.is_empty() {
            return LoadOutcome::Fresh;
        }

        let decoded = match self.codec.decode(&raw) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(session_id = %self.id, "undecodable session payload: {}", e);
                return LoadOutcome::CorruptDegradedToFresh;
            }
        };

        match serde_json::from_str::<Map<String, Value>>(&decoded) {
            Ok(incoming) => {
                merge_keep_existing(&mut self.attributes, incoming);
                LoadOutcome::Restored
            }
            Err(e) => {
                tracing::debug!(session_id = %self.id, "unparseable session payload: {}", e);
                LoadOutcome::CorruptDegradedToFresh
            }
        }
    }

    /// Age flash data, serialize the attribute bag through the codec and
    /// write it via the handler. Write errors propagate; the session
    /// leaves the started state either way.
    pub async fn save(&mut self) -> Result<(), SessionError> {
        self.age_flash_data();

        let json = serde_json::to_string(&self.attributes)?;
        let payload = self.codec.encode(json)?;
        let result = self.handler.write(&self.id, &payload).await;

        self.started = false;
        result
    }

    /// Read an attribute at a dot-path, deserialized into `T`.
    ///
    /// Returns `None` when the path is unset or the value does not fit
    /// `T`; chain `unwrap_or`/`unwrap_or_default` for a default.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get_value(path)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Read the raw JSON value at a dot-path.
    pub fn get_value(&self, path: &str) -> Option<&Value> {
        dot_get(&self.attributes, path)
    }

    /// Set an attribute at a dot-path, creating intermediate objects as
    /// needed. Unserializable values are silently dropped.
    pub fn set<T: Serialize>(&mut self, path: &str, value: T) {
        if let Ok(value) = serde_json::to_value(value) {
            dot_set(&mut self.attributes, path, value);
        }
    }

    /// Whether an attribute is set and non-null at a dot-path.
    pub fn has(&self, path: &str) -> bool {
        self.get_value(path).map_or(false, |v| !v.is_null())
    }

    /// Read and remove a single top-level key (not dot-path aware).
    pub fn pull<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        self.attributes
            .remove(key)
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Put a key/value pair in the session. Alias of [`Store::set`],
    /// kept for parity with the bulk form.
    pub fn put<T: Serialize>(&mut self, key: &str, value: T) {
        self.set(key, value);
    }

    /// Merge a mapping of key/value pairs into the session, each key
    /// routed through [`Store::set`].
    pub fn put_many(&mut self, values: Map<String, Value>) {
        for (key, value) in values {
            dot_set(&mut self.attributes, &key, value);
        }
    }

    /// Append a value to an array-valued attribute. An absent attribute
    /// becomes a one-element array; a non-array value makes this a
    /// silent no-op.
    pub fn push<T: Serialize>(&mut self, key: &str, value: T) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };

        let mut array = match self.get_value(key) {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => return,
        };
        array.push(value);
        dot_set(&mut self.attributes, key, Value::Array(array));
    }

    /// The live attribute mapping. Not a snapshot; later mutations show
    /// through.
    pub fn all(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Remove one top-level key.
    pub fn forget(&mut self, key: &str) {
        self.attributes.remove(key);
    }

    /// Remove every attribute.
    pub fn flush(&mut self) {
        self.attributes.clear();
    }

    /// Set `_token` to a fresh random value.
    pub fn regenerate_token(&mut self) {
        self.put(TOKEN_KEY, sid::generate());
    }

    /// The current CSRF token, present once `start` has completed.
    pub fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY)
    }

    /// Move the session to a freshly generated id, keeping all
    /// attributes. With `destroy` the handler record under the old id is
    /// deleted; otherwise it is left for garbage collection.
    pub async fn regenerate(&mut self, destroy: bool) -> Result<(), SessionError> {
        if destroy {
            self.handler.destroy(&self.id).await?;
        }

        self.set_exists(false);
        self.set_id(None);
        Ok(())
    }

    /// Alias of [`Store::regenerate`], kept for callers used to the
    /// migrate/regenerate pair.
    pub async fn migrate(&mut self, destroy: bool) -> Result<(), SessionError> {
        self.regenerate(destroy).await
    }

    /// Forward existence state to the handler, when it tracks any.
    pub fn set_exists(&self, value: bool) {
        self.handler.set_exists(value);
    }

    /// Flash a key/value pair: visible now and for exactly one more
    /// request, unless re-flashed or kept.
    pub fn flash<T: Serialize>(&mut self, key: &str, value: T) {
        self.put(key, value);
        self.push(FLASH_NEW, key);
        self.remove_from_old_flash_data(&[key]);
    }

    /// Flash request input under the `_old_input` key.
    pub fn flash_input(&mut self, values: Vec<Value>) {
        self.flash(OLD_INPUT_KEY, values);
    }

    /// Extend all current flash data for one more request.
    pub fn reflash(&mut self) {
        let old = self.flash_list(FLASH_OLD);
        self.merge_new_flashes(&old);
        self.set(FLASH_OLD, Vec::<String>::new());
    }

    /// Extend a subset of the current flash data for one more request.
    pub fn keep(&mut self, keys: &[&str]) {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        self.merge_new_flashes(&keys);
        self.remove_from_old_flash_data(&keys.iter().map(String::as_str).collect::<Vec<_>>());
    }

    /// Age the flash data: drop every key staged in `flash.old`, stage
    /// the `flash.new` keys for the next pass, reset `flash.new`.
    pub fn age_flash_data(&mut self) {
        for key in self.flash_list(FLASH_OLD) {
            self.forget(&key);
        }

        let aged = self.flash_list(FLASH_NEW);
        self.set(FLASH_OLD, aged);
        self.set(FLASH_NEW, Vec::<String>::new());
    }

    fn flash_list(&self, path: &str) -> Vec<String> {
        self.get(path).unwrap_or_default()
    }

    fn merge_new_flashes(&mut self, keys: &[String]) {
        let mut merged = self.flash_list(FLASH_NEW);
        for key in keys {
            if !merged.contains(key) {
                merged.push(key.clone());
            }
        }
        self.set(FLASH_NEW, merged);
    }

    fn remove_from_old_flash_data(&mut self, keys: &[&str]) {
        let old: Vec<String> = self
            .flash_list(FLASH_OLD)
            .into_iter()
            .filter(|k| !keys.contains(&k.as_str()))
            .collect();
        self.set(FLASH_OLD, old);
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("started", &self.started)
            .field("attributes", &self.attributes)
            .finish()
    }
}
