//! View construction.
//!
//! An [`Adapter`] owns a [`RenderConfig`] and the request-scoped
//! [`Collaborators`]. Each call to [`get_view`](Adapter::get_view) builds a
//! brand-new engine rooted at one template directory, registers every
//! configured capability on it, and returns a [`RenderSession`] bound to that
//! engine. Nothing is memoized: callers that render repeatedly should keep the
//! session.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pageview::{Adapter, Collaborators, RenderConfig, StaticTopology, StaticWebPage};
//!
//! let request = http::Request::get("https://example.com/page").body(()).unwrap();
//! let collaborators = Collaborators::new(
//!     Arc::new(StaticTopology::new("./templates")),
//!     Arc::new(StaticWebPage::new().with_var("site", "Example")),
//!     request,
//! );
//! let adapter = Adapter::new(RenderConfig::default(), collaborators);
//!
//! let mut view = adapter.view()?;
//! view.assign("title", "Home");
//! let response = view.render("home.html", Default::default(), Some(http::StatusCode::OK))?;
//! # Ok::<(), pageview::RenderError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::{Request, StatusCode};

use crate::collaborators::{
    DefaultResponseFactory, EventSink, NoCache, ResponseFactory, TemplateCache, Topology,
    TracingSink, WebPage,
};
use crate::config::RenderConfig;
use crate::engine::{EngineFactory, MiniJinjaFactory, TemplateEngine};
use crate::error::RenderError;
use crate::response::ResponseShell;
use crate::session::RenderSession;

/// Request-scoped collaborators a view is bound to.
#[derive(Clone)]
pub struct Collaborators {
    pub topology: Arc<dyn Topology>,
    pub web_page: Arc<dyn WebPage>,
    pub request: Arc<Request<()>>,
    pub responses: Arc<dyn ResponseFactory>,
    pub cache: Arc<dyn TemplateCache>,
    pub events: Arc<dyn EventSink>,
}

impl Collaborators {
    /// Creates collaborators with the default response factory, no cache and
    /// a `tracing`-backed event sink.
    pub fn new(
        topology: Arc<dyn Topology>,
        web_page: Arc<dyn WebPage>,
        request: Request<()>,
    ) -> Self {
        Self {
            topology,
            web_page,
            request: Arc::new(request),
            responses: Arc::new(DefaultResponseFactory),
            cache: Arc::new(NoCache),
            events: Arc::new(TracingSink),
        }
    }

    pub fn with_response_factory(mut self, responses: Arc<dyn ResponseFactory>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn TemplateCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }
}

/// Builds render sessions from a configuration and its collaborators.
pub struct Adapter {
    config: RenderConfig,
    collaborators: Collaborators,
    engines: Arc<dyn EngineFactory>,
}

impl Adapter {
    /// Creates an adapter that builds MiniJinja engines.
    ///
    /// The adapter takes ownership of `config`; it is read-only from here on.
    pub fn new(config: RenderConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            engines: Arc::new(MiniJinjaFactory),
        }
    }

    /// Replaces the engine factory, returning `self` for chaining.
    pub fn with_engine_factory(mut self, engines: Arc<dyn EngineFactory>) -> Self {
        self.engines = engines;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Builds a session for the topology's template root and a 404 response.
    pub fn view(&self) -> Result<RenderSession, RenderError> {
        self.get_view(None, None)
    }

    /// Builds a session bound to a fresh engine.
    ///
    /// `template_root` defaults to the topology's template path. `response`
    /// defaults to an empty `404 Not Found` shell from the response factory;
    /// a successful render overwrites its status.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Setup`] when the engine cannot be built, or any
    /// error raised while registering a capability.
    pub fn get_view(
        &self,
        template_root: Option<&Path>,
        response: Option<ResponseShell>,
    ) -> Result<RenderSession, RenderError> {
        let root: PathBuf = match template_root {
            Some(root) => root.to_path_buf(),
            None => self.collaborators.topology.template_path(),
        };
        let response = response.unwrap_or_else(|| {
            self.collaborators
                .responses
                .create_response(StatusCode::NOT_FOUND)
        });

        let mut engine =
            self.engines
                .create(&root, &self.config, Arc::clone(&self.collaborators.cache))?;
        self.register_capabilities(engine.as_mut())?;

        tracing::debug!(
            root = %root.display(),
            filters = self.config.filters().len(),
            functions = self.config.functions().len(),
            extensions = self.config.extensions().len(),
            "view created"
        );

        Ok(RenderSession::new(
            engine,
            Arc::clone(&self.collaborators.web_page),
            Arc::clone(&self.collaborators.request),
            response,
            Arc::clone(&self.collaborators.cache),
            Arc::clone(&self.collaborators.events),
            self.config.charset(),
        ))
    }

    // Config list order is registration order; later entries may shadow earlier ones.
    fn register_capabilities(&self, engine: &mut dyn TemplateEngine) -> Result<(), RenderError> {
        for filter in self.config.filters() {
            engine.register_filter(filter)?;
        }
        for function in self.config.functions() {
            engine.register_function(function)?;
        }
        for extension in self.config.extensions() {
            engine.register_extension(extension)?;
        }
        Ok(())
    }
}
