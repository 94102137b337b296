//! Per-request render sessions.
//!
//! A [`RenderSession`] accumulates template variables through
//! [`assign`](RenderSession::assign) and consumes them on the next
//! [`fetch`](RenderSession::fetch) or [`render`](RenderSession::render). The
//! variable buffer is single-use: it is emptied by every fetch, whether the
//! render succeeds or not, so a second fetch without new assignments sees only
//! the page globals.
//!
//! # Variable precedence
//!
//! From lowest to highest:
//!
//! 1. page globals from the bound [`WebPage`]
//! 2. variables accumulated with `assign*`
//! 3. variables passed to the fetch/render call itself
//!
//! # Errors
//!
//! Engine failures are returned as [`RenderError`]. Before returning, the
//! session logs the failure and sends an `ERROR` notification to the bound
//! [`EventSink`]. No partial output is ever produced.
//!
//! Sessions are single-owner: every mutating method takes `&mut self`.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Request, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::Level;

use crate::collaborators::{EventSink, TemplateCache, WebPage};
use crate::engine::TemplateEngine;
use crate::error::RenderError;
use crate::response::ResponseShell;
use crate::Variables;

/// Whether a session currently holds assigned variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No variables assigned since the last fetch.
    Idle,
    /// At least one variable is waiting for the next fetch.
    Accumulating,
}

/// A view bound to one engine and one request.
pub struct RenderSession {
    engine: Box<dyn TemplateEngine>,
    web_page: Arc<dyn WebPage>,
    request: Arc<Request<()>>,
    response: ResponseShell,
    cache: Arc<dyn TemplateCache>,
    events: Arc<dyn EventSink>,
    charset: String,
    variables: Variables,
}

impl RenderSession {
    pub(crate) fn new(
        engine: Box<dyn TemplateEngine>,
        web_page: Arc<dyn WebPage>,
        request: Arc<Request<()>>,
        response: ResponseShell,
        cache: Arc<dyn TemplateCache>,
        events: Arc<dyn EventSink>,
        charset: &str,
    ) -> Self {
        Self {
            engine,
            web_page,
            request,
            response,
            cache,
            events,
            charset: charset.to_string(),
            variables: Variables::new(),
        }
    }

    /// Assigns one variable; a later assignment to the same key wins.
    pub fn assign(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Assigns every pair in `vars`.
    pub fn assign_all<I, K, V>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.variables
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Assigns the fields of a serializable struct or map.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Serialization`] if `data` does not serialize to
    /// a JSON object.
    pub fn assign_serialized<T: Serialize + ?Sized>(
        &mut self,
        data: &T,
    ) -> Result<&mut Self, RenderError> {
        match serde_json::to_value(data)? {
            Value::Object(map) => {
                self.variables.extend(map);
                Ok(self)
            }
            other => Err(RenderError::Serialization(format!(
                "expected an object of template variables, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Renders `name` with page globals and assigned variables.
    pub fn fetch(&mut self, name: &str) -> Result<String, RenderError> {
        self.fetch_with(name, Variables::new())
    }

    /// Renders `name`, with `vars` taking precedence over everything else.
    ///
    /// The assigned variables are consumed by this call.
    pub fn fetch_with(&mut self, name: &str, vars: Variables) -> Result<String, RenderError> {
        let assigned = std::mem::take(&mut self.variables);

        let mut context = self.web_page.globals();
        context.extend(assigned);
        context.extend(vars);

        tracing::trace!(template = name, variables = context.len(), "rendering template");
        let result = self
            .engine
            .load(name)
            .and_then(|()| self.engine.render(name, &context));

        if let Err(err) = &result {
            tracing::warn!(template = name, error = %err, "render failed");
            self.events
                .notify(Level::ERROR, &format!("render of '{name}' failed: {err}"));
        }
        result
    }

    /// Renders `name` into the response body and returns the response.
    ///
    /// The status is only changed when `status` is given. A
    /// `Content-Type: text/html; charset=<charset>` header is added unless the
    /// response already carries a content type.
    ///
    /// # Errors
    ///
    /// Any error from [`fetch_with`](Self::fetch_with); the response is left
    /// untouched in that case.
    pub fn render(
        &mut self,
        name: &str,
        vars: Variables,
        status: Option<StatusCode>,
    ) -> Result<&mut ResponseShell, RenderError> {
        let output = self.fetch_with(name, vars)?;

        self.response.body_mut().write_all(output.as_bytes())?;
        if let Some(status) = status {
            self.response.set_status(status);
        }
        if !self.response.headers().contains_key(CONTENT_TYPE) {
            match HeaderValue::from_str(&format!("text/html; charset={}", self.charset)) {
                Ok(value) => {
                    self.response.headers_mut().insert(CONTENT_TYPE, value);
                }
                Err(_) => {
                    tracing::warn!(charset = %self.charset, "charset is not a valid header value")
                }
            }
        }
        Ok(&mut self.response)
    }

    pub fn state(&self) -> SessionState {
        if self.variables.is_empty() {
            SessionState::Idle
        } else {
            SessionState::Accumulating
        }
    }

    /// Variables assigned since the last fetch.
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn engine(&self) -> &dyn TemplateEngine {
        self.engine.as_ref()
    }

    pub fn request(&self) -> &Request<()> {
        &self.request
    }

    pub fn response(&self) -> &ResponseShell {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseShell {
        &mut self.response
    }

    /// The shared cache handle the engine was built with.
    pub fn cache(&self) -> &Arc<dyn TemplateCache> {
        &self.cache
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn into_response(self) -> ResponseShell {
        self.response
    }
}

impl fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut assigned: Vec<&String> = self.variables.keys().collect();
        assigned.sort();
        f.debug_struct("RenderSession")
            .field("root", &self.engine.root())
            .field("state", &self.state())
            .field("variables", &assigned)
            .field("status", &self.response.status())
            .finish_non_exhaustive()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
