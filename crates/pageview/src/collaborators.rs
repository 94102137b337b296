//! Collaborators a view consumes.
//!
//! These traits abstract over the parts of the web application that the
//! rendering core only talks to: where templates live, which page-wide
//! variables exist, where compiled artifacts are cached, where notifications
//! go, and how empty responses are made. Default implementations cover the
//! common case; the `Mock*` types record what they see and are meant for tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use http::StatusCode;
use serde_json::Value;
use tracing::Level;

use crate::response::ResponseShell;
use crate::Variables;

/// Source of the default template root.
pub trait Topology: Send + Sync {
    /// Directory template names are resolved against.
    fn template_path(&self) -> PathBuf;
}

/// Source of page-global template variables.
pub trait WebPage: Send + Sync {
    /// Variables merged into every render at the lowest precedence.
    fn globals(&self) -> Variables;
}

/// String-keyed store shared across requests.
///
/// Engines may use it for compiled artifacts. Implementations must tolerate
/// concurrent reads and writes from independent engines.
pub trait TemplateCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn has(&self, key: &str) -> bool;
    fn delete(&self, key: &str) -> bool;
}

/// Receiver of error and diagnostic notifications.
pub trait EventSink: Send + Sync {
    fn notify(&self, level: Level, message: &str);
}

/// Factory for empty responses.
pub trait ResponseFactory: Send + Sync {
    fn create_response(&self, status: StatusCode) -> ResponseShell;
}

// === Default implementations ===

/// Topology with a fixed template root.
#[derive(Debug, Clone)]
pub struct StaticTopology {
    template_path: PathBuf,
}

impl StaticTopology {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
        }
    }
}

impl Topology for StaticTopology {
    fn template_path(&self) -> PathBuf {
        self.template_path.clone()
    }
}

/// Web page with a fixed set of globals.
#[derive(Debug, Clone, Default)]
pub struct StaticWebPage {
    globals: Variables,
}

impl StaticWebPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a global, returning `self` for chaining.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(key.into(), value.into());
        self
    }
}

impl WebPage for StaticWebPage {
    fn globals(&self) -> Variables {
        self.globals.clone()
    }
}

/// Cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl TemplateCache for NoCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: String) {}

    fn has(&self, _key: &str) -> bool {
        false
    }

    fn delete(&self, _key: &str) -> bool {
        false
    }
}

/// Event sink that forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn notify(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "pageview::events", "{message}"),
            Level::WARN => tracing::warn!(target: "pageview::events", "{message}"),
            Level::INFO => tracing::info!(target: "pageview::events", "{message}"),
            Level::DEBUG => tracing::debug!(target: "pageview::events", "{message}"),
            _ => tracing::trace!(target: "pageview::events", "{message}"),
        }
    }
}

/// Produces empty responses with the requested status.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResponseFactory;

impl ResponseFactory for DefaultResponseFactory {
    fn create_response(&self, status: StatusCode) -> ResponseShell {
        ResponseShell::new(status)
    }
}

// === Mock implementations for testing ===

/// In-process cache for tests.
#[derive(Debug, Default)]
pub struct MockCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl TemplateCache for MockCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value);
        }
    }

    fn has(&self, key: &str) -> bool {
        self.entries
            .read()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }

    fn delete(&self, key: &str) -> bool {
        self.entries
            .write()
            .map(|mut e| e.remove(key).is_some())
            .unwrap_or(false)
    }
}

/// Event sink that records every notification.
#[derive(Debug, Default)]
pub struct MockEventSink {
    events: Mutex<Vec<(Level, String)>>,
}

impl MockEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far, oldest first.
    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for MockEventSink {
    fn notify(&self, level: Level, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((level, message.to_string()));
        }
    }
}
