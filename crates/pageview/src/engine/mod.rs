//! Template engine abstraction.
//!
//! The rendering core never parses or evaluates templates itself. It drives an
//! engine through the [`TemplateEngine`] trait and obtains fresh instances from
//! an [`EngineFactory`]. The default binding is [`MiniJinjaEngine`], created by
//! [`MiniJinjaFactory`].
//!
//! An engine is rooted at one template directory and configured once, at
//! construction, from a [`RenderConfig`]. Capabilities are registered
//! afterwards and recorded in order, so two engines built from the same
//! configuration report identical [`registrations`](TemplateEngine::registrations).

mod escape;
mod jinja;
mod loader;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::capability::{ExtensionObject, Filter, Function, Registration};
use crate::collaborators::TemplateCache;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::Variables;

pub use self::jinja::{MiniJinjaEngine, MiniJinjaFactory};
pub use self::loader::{SearchPath, TEMPLATE_EXTENSIONS};

/// A template engine bound to one template root.
///
/// Engines are owned by a single view and are not shared between threads
/// while rendering, hence `Send` without `Sync`.
pub trait TemplateEngine: Send {
    /// The directory template names are resolved against first.
    fn root(&self) -> &Path;

    fn register_filter(&mut self, filter: &Filter) -> Result<(), RenderError>;

    fn register_function(&mut self, function: &Function) -> Result<(), RenderError>;

    /// Records the extension and lets it install its capabilities.
    fn register_extension(&mut self, extension: &ExtensionObject) -> Result<(), RenderError>;

    /// Adds a value visible to every template rendered by this engine.
    fn add_global(&mut self, name: &str, value: Value) -> Result<(), RenderError>;

    /// Loads and compiles a template.
    ///
    /// # Errors
    ///
    /// [`RenderError::TemplateNotFound`] when no search directory holds the
    /// template, [`RenderError::TemplateSyntax`] when it does not compile.
    fn load(&mut self, name: &str) -> Result<(), RenderError>;

    /// Renders a template previously passed to [`load`](Self::load).
    fn render(&self, name: &str, variables: &Variables) -> Result<String, RenderError>;

    /// Everything registered so far, in registration order.
    fn registrations(&self) -> &[Registration];
}

/// Creates configured engines.
pub trait EngineFactory: Send + Sync {
    /// Builds a fresh engine rooted at `root` and configured from `config`.
    ///
    /// Capabilities in `config` are not registered here; the caller does that
    /// so registration order stays under its control.
    fn create(
        &self,
        root: &Path,
        config: &RenderConfig,
        cache: Arc<dyn TemplateCache>,
    ) -> Result<Box<dyn TemplateEngine>, RenderError>;
}
