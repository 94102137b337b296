//! # pageview - template views for web applications
//!
//! `pageview` sits between a web application and a template engine. It owns
//! three things:
//!
//! - [`RenderConfig`]: validated rendering configuration (delimiters, cache
//!   directory, debug, auto-reload, strict variables, charset, autoescape,
//!   plugin directories, and registered filters, functions and extensions)
//! - [`Adapter`]: builds one engine per template root from that configuration
//!   and hands out a [`RenderSession`]
//! - [`RenderSession`]: merges page-global and call-scoped variables, runs the
//!   engine, and writes the result into an HTTP response
//!
//! Template parsing and evaluation belong to the engine behind the
//! [`TemplateEngine`] trait; the default binding uses MiniJinja. Everything
//! else the core talks to (template topology, page globals, cache, event sink,
//! response factory) is a trait in [`collaborators`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use http::StatusCode;
//! use pageview::{Adapter, Collaborators, RenderConfig, StaticTopology, StaticWebPage, Variables};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("hello.html"), "{{ greeting }}, {{ name }}!").unwrap();
//!
//! let config = RenderConfig::default().with_auto_escape("html").unwrap();
//! let collaborators = Collaborators::new(
//!     Arc::new(StaticTopology::new(dir.path())),
//!     Arc::new(StaticWebPage::new().with_var("greeting", "Hello")),
//!     http::Request::get("https://example.com/").body(()).unwrap(),
//! );
//! let adapter = Adapter::new(config, collaborators);
//!
//! let mut view = adapter.view().unwrap();
//! view.assign("name", "<World>");
//! let response = view.render("hello.html", Variables::new(), Some(StatusCode::OK)).unwrap();
//!
//! response.body_mut().rewind();
//! assert_eq!(response.body_mut().contents().unwrap(), "Hello, &lt;World&gt;!");
//! assert_eq!(response.status(), StatusCode::OK);
//! ```
//!
//! ## Error policy
//!
//! Configuration mistakes surface as [`ConfigError`] while the configuration
//! is built. Render failures are returned as a single [`RenderError`] from
//! [`RenderSession::fetch`] and [`RenderSession::render`], and are also sent
//! to the bound [`EventSink`]. They are never swallowed.

pub mod adapter;
pub mod capability;
pub mod collaborators;
pub mod config;
pub mod engine;
mod error;
pub mod response;
pub mod session;

use std::collections::HashMap;

/// Template variables by name.
pub type Variables = HashMap<String, serde_json::Value>;

pub use adapter::{Adapter, Collaborators};
pub use capability::{
    Callable, CapabilityKind, Extension, ExtensionObject, Filter, Function, Globals, Registration,
};
pub use collaborators::{
    DefaultResponseFactory, EventSink, MockCache, MockEventSink, NoCache, ResponseFactory,
    StaticTopology, StaticWebPage, TemplateCache, Topology, TracingSink, WebPage,
};
pub use config::{AutoEscape, DelimiterKind, Delimiters, RenderConfig, AUTO_ESCAPE_TOKENS};
pub use engine::{
    EngineFactory, MiniJinjaEngine, MiniJinjaFactory, SearchPath, TemplateEngine,
    TEMPLATE_EXTENSIONS,
};
pub use error::{ConfigError, RenderError};
pub use response::{Body, ResponseShell};
pub use session::{RenderSession, SessionState};
