//! Capabilities registered into every engine a view creates.
//!
//! A capability is an opaque descriptor handed to the engine verbatim:
//!
//! - [`Filter`]: callable used as `{{ value | name(args) }}`
//! - [`Function`]: callable used as `{{ name(args) }}`
//! - [`Extension`]: object that installs its own filters, functions or globals
//!
//! Callables work on [`serde_json::Value`] so they stay independent of the
//! engine backend. For filters the piped value arrives as the first argument.
//!
//! ```rust
//! use pageview::{Filter, RenderConfig};
//! use serde_json::Value;
//!
//! let shout = Filter::new("shout", |args: &[Value]| {
//!     let text = args.first().and_then(Value::as_str).unwrap_or_default();
//!     Ok(Value::String(text.to_uppercase()))
//! });
//! let config = RenderConfig::default().add_filter(shout);
//! assert_eq!(config.filters().len(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::engine::TemplateEngine;
use crate::error::RenderError;
use crate::Variables;

/// Shared callable behind a [`Filter`] or [`Function`].
pub type Callable = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Kind of a registered capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Filter,
    Function,
    Extension,
    Global,
}

/// A capability as recorded by an engine, in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub kind: CapabilityKind,
    pub name: String,
}

impl Registration {
    pub fn new(kind: CapabilityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

macro_rules! callable_descriptor {
    ($(#[$meta:meta])* $ty:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $ty {
            name: String,
            callable: Callable,
        }

        impl $ty {
            /// Creates a descriptor from a name and a callable.
            pub fn new<F>(name: impl Into<String>, f: F) -> Self
            where
                F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
            {
                Self {
                    name: name.into(),
                    callable: Arc::new(f),
                }
            }

            /// The name templates use to reach this callable.
            pub fn name(&self) -> &str {
                &self.name
            }

            /// A shared handle to the callable.
            pub fn callable(&self) -> Callable {
                Arc::clone(&self.callable)
            }

            /// Invokes the callable directly.
            pub fn call(&self, args: &[Value]) -> anyhow::Result<Value> {
                (self.callable)(args)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("name", &self.name)
                    .finish_non_exhaustive()
            }
        }

        // Two descriptors are equal when they share both the name and the callable.
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.name == other.name && Arc::ptr_eq(&self.callable, &other.callable)
            }
        }
    };
}

callable_descriptor!(
    /// A template filter.
    Filter
);

callable_descriptor!(
    /// A template function.
    Function
);

/// An object that extends an engine with several capabilities at once.
///
/// Extensions only talk to the [`TemplateEngine`] trait, so the same extension
/// works with any engine binding.
pub trait Extension: Send + Sync {
    /// Name recorded in the engine's registrations.
    fn name(&self) -> &str;

    /// Installs this extension's capabilities into `engine`.
    fn install(&self, engine: &mut dyn TemplateEngine) -> Result<(), RenderError>;
}

/// Shared handle to a registered [`Extension`].
#[derive(Clone)]
pub struct ExtensionObject(Arc<dyn Extension>);

impl ExtensionObject {
    pub fn new(extension: impl Extension + 'static) -> Self {
        Self(Arc::new(extension))
    }

    pub fn from_arc(extension: Arc<dyn Extension>) -> Self {
        Self(extension)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn install(&self, engine: &mut dyn TemplateEngine) -> Result<(), RenderError> {
        self.0.install(engine)
    }
}

impl fmt::Debug for ExtensionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExtensionObject").field(&self.name()).finish()
    }
}

impl PartialEq for ExtensionObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Extension that installs a fixed set of global values.
///
/// ```rust
/// use pageview::{Globals, RenderConfig};
///
/// let site = Globals::new("site")
///     .with("site_name", "Example")
///     .with("year", 2026);
/// let config = RenderConfig::default().add_extension(site);
/// assert_eq!(config.extensions()[0].name(), "site");
/// ```
#[derive(Debug, Clone)]
pub struct Globals {
    name: String,
    values: Variables,
}

impl Globals {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Variables::new(),
        }
    }

    /// Adds a global, returning `self` for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl Extension for Globals {
    fn name(&self) -> &str {
        &self.name
    }

    fn install(&self, engine: &mut dyn TemplateEngine) -> Result<(), RenderError> {
        // Sorted so every engine receives globals in the same order.
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        for key in keys {
            engine.add_global(key, self.values[key].clone())?;
        }
        Ok(())
    }
}
