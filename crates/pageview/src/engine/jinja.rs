//! MiniJinja binding for [`TemplateEngine`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::syntax::SyntaxConfig;
use minijinja::value::{Rest, Value};
use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior};

use super::escape;
use super::loader::SearchPath;
use super::{EngineFactory, TemplateEngine};
use crate::capability::{
    Callable, CapabilityKind, ExtensionObject, Filter, Function, Registration,
};
use crate::collaborators::TemplateCache;
use crate::config::{DelimiterKind, RenderConfig};
use crate::error::RenderError;
use crate::Variables;

/// Factory for [`MiniJinjaEngine`]s. This is the adapter's default.
#[derive(Debug, Default, Clone, Copy)]
pub struct MiniJinjaFactory;

impl EngineFactory for MiniJinjaFactory {
    fn create(
        &self,
        root: &Path,
        config: &RenderConfig,
        cache: Arc<dyn TemplateCache>,
    ) -> Result<Box<dyn TemplateEngine>, RenderError> {
        Ok(Box::new(MiniJinjaEngine::new(root, config, cache)?))
    }
}

/// Template engine backed by a MiniJinja [`Environment`].
///
/// Configuration is applied once, at construction:
///
/// - delimiters through a custom [`SyntaxConfig`]
/// - strict variables as [`UndefinedBehavior::Strict`], otherwise lenient
/// - debug mode, which also makes error messages include template context
/// - one auto-escape strategy for every template
/// - a loader over the template root followed by the plugin directories,
///   caching sources in the [`TemplateCache`] when a cache dir is set
///
/// With auto-reload on, [`load`](TemplateEngine::load) drops compiled
/// templates first so the loader reads sources again.
pub struct MiniJinjaEngine {
    env: Environment<'static>,
    root: PathBuf,
    search: SearchPath,
    debug: bool,
    auto_reload: bool,
    charset: String,
    registrations: Vec<Registration>,
}

impl MiniJinjaEngine {
    /// Builds an engine rooted at `root` and configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Setup`] when the delimiters cannot form a valid
    /// syntax.
    pub fn new(
        root: &Path,
        config: &RenderConfig,
        cache: Arc<dyn TemplateCache>,
    ) -> Result<Self, RenderError> {
        let mut env = Environment::new();

        let variable = config.delimiters(DelimiterKind::Variable);
        let block = config.delimiters(DelimiterKind::Block);
        let comment = config.delimiters(DelimiterKind::Comment);
        let syntax = SyntaxConfig::builder()
            .variable_delimiters(variable.left.clone(), variable.right.clone())
            .block_delimiters(block.left.clone(), block.right.clone())
            .comment_delimiters(comment.left.clone(), comment.right.clone())
            .build()
            .map_err(|e| RenderError::Setup(e.to_string()))?;
        env.set_syntax(syntax);

        env.set_debug(config.debug());
        env.set_undefined_behavior(if config.strict_variables() {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        });

        let mode = escape::engine_mode(config.auto_escape());
        env.set_auto_escape_callback(move |_name: &str| mode);
        env.set_formatter(escape::format_value);

        let mut search = SearchPath::new(root, config.extensions_dirs().iter().cloned());
        if config.has_cache_dir() {
            search = search.with_cache(cache, config.cache_dir(), config.auto_reload());
        }
        let loader = search.clone();
        env.set_loader(move |name: &str| {
            loader.load(name).map_err(|e| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    format!("could not read template '{name}'"),
                )
                .with_source(e)
            })
        });

        tracing::debug!(
            root = %root.display(),
            search_dirs = search.dirs().len(),
            strict = config.strict_variables(),
            auto_reload = config.auto_reload(),
            auto_escape = ?config.auto_escape(),
            "minijinja engine created"
        );

        Ok(Self {
            env,
            root: root.to_path_buf(),
            search,
            debug: config.debug(),
            auto_reload: config.auto_reload(),
            charset: config.charset().to_string(),
            registrations: Vec::new(),
        })
    }

    /// The directories templates are looked up in, root first.
    pub fn search_dirs(&self) -> &[PathBuf] {
        self.search.dirs()
    }

    /// The configured output charset.
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Returns a reference to the underlying MiniJinja environment.
    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    /// Returns a mutable reference to the underlying MiniJinja environment.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }

    fn translate(&self, err: Error) -> RenderError {
        let message = if self.debug {
            format!("{err:#}")
        } else {
            err.to_string()
        };
        match err.kind() {
            ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(message),
            ErrorKind::SyntaxError | ErrorKind::BadEscape => RenderError::TemplateSyntax(message),
            ErrorKind::UndefinedError => RenderError::UndefinedVariable(message),
            ErrorKind::BadSerialization => RenderError::Serialization(message),
            _ => RenderError::Engine(message),
        }
    }
}

fn invoke(callable: &Callable, args: &[Value]) -> Result<Value, Error> {
    let args = args
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::new(ErrorKind::BadSerialization, e.to_string()))?;
    let result =
        callable(&args).map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;
    Ok(Value::from_serialize(&result))
}

impl TemplateEngine for MiniJinjaEngine {
    fn root(&self) -> &Path {
        &self.root
    }

    fn register_filter(&mut self, filter: &Filter) -> Result<(), RenderError> {
        let callable = filter.callable();
        self.env
            .add_filter(filter.name().to_string(), move |args: Rest<Value>| {
                invoke(&callable, &args)
            });
        self.registrations
            .push(Registration::new(CapabilityKind::Filter, filter.name()));
        Ok(())
    }

    fn register_function(&mut self, function: &Function) -> Result<(), RenderError> {
        let callable = function.callable();
        self.env
            .add_function(function.name().to_string(), move |args: Rest<Value>| {
                invoke(&callable, &args)
            });
        self.registrations
            .push(Registration::new(CapabilityKind::Function, function.name()));
        Ok(())
    }

    fn register_extension(&mut self, extension: &ExtensionObject) -> Result<(), RenderError> {
        self.registrations
            .push(Registration::new(CapabilityKind::Extension, extension.name()));
        extension.install(self)
    }

    fn add_global(&mut self, name: &str, value: serde_json::Value) -> Result<(), RenderError> {
        self.env
            .add_global(name.to_string(), Value::from_serialize(&value));
        self.registrations
            .push(Registration::new(CapabilityKind::Global, name));
        Ok(())
    }

    fn load(&mut self, name: &str) -> Result<(), RenderError> {
        if self.auto_reload {
            self.env.clear_templates();
        }
        self.env
            .get_template(name)
            .map(|_| ())
            .map_err(|e| self.translate(e))
    }

    fn render(&self, name: &str, variables: &Variables) -> Result<String, RenderError> {
        let template = self.env.get_template(name).map_err(|e| self.translate(e))?;
        template
            .render(Value::from_serialize(variables))
            .map_err(|e| self.translate(e))
    }

    fn registrations(&self) -> &[Registration] {
        &self.registrations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Globals;
    use crate::collaborators::{MockCache, NoCache};
    use serde_json::json;
    use std::fs;

    fn engine_for(root: &Path, config: &RenderConfig) -> MiniJinjaEngine {
        MiniJinjaEngine::new(root, config, Arc::new(NoCache)).unwrap()
    }

    fn vars(pairs: &[(&str, serde_json::Value)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn render(engine: &mut MiniJinjaEngine, name: &str, variables: &Variables) -> String {
        engine.load(name).unwrap();
        engine.render(name, variables).unwrap()
    }

    #[test]
    fn test_renders_from_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.html"), "Hello, {{ name }}!").unwrap();

        let mut engine = engine_for(dir.path(), &RenderConfig::default());
        let out = render(&mut engine, "hello.html", &vars(&[("name", json!("World"))]));
        assert_eq!(out, "Hello, World!");
    }

    #[test]
    fn test_custom_delimiters() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("page.html"),
            "<% if show %>[[ name ]]<% endif %><# hidden #>",
        )
        .unwrap();

        let config = RenderConfig::default()
            .with_delimiters(DelimiterKind::Variable, "[[", "]]")
            .with_delimiters(DelimiterKind::Block, "<%", "%>")
            .with_delimiters(DelimiterKind::Comment, "<#", "#>");
        let mut engine = engine_for(dir.path(), &config);
        let out = render(
            &mut engine,
            "page.html",
            &vars(&[("show", json!(true)), ("name", json!("x"))]),
        );
        assert_eq!(out, "x");
    }

    #[test]
    fn test_strict_variables_fail_on_undefined() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), "[{{ missing }}]").unwrap();

        let mut strict = engine_for(dir.path(), &RenderConfig::default());
        strict.load("page.html").unwrap();
        let err = strict.render("page.html", &Variables::new()).unwrap_err();
        assert!(matches!(err, RenderError::UndefinedVariable(_)));

        let lenient_config = RenderConfig::default().with_strict_variables(false);
        let mut lenient = engine_for(dir.path(), &lenient_config);
        assert_eq!(render(&mut lenient, "page.html", &Variables::new()), "[]");
    }

    #[test]
    fn test_missing_template_and_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.html"), "{{ unclosed").unwrap();

        let mut engine = engine_for(dir.path(), &RenderConfig::default());
        assert!(matches!(
            engine.load("nope.html"),
            Err(RenderError::TemplateNotFound(_))
        ));
        assert!(matches!(
            engine.load("broken.html"),
            Err(RenderError::TemplateSyntax(_))
        ));
    }

    #[test]
    fn test_auto_escape_strategies() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("v.html"), "{{ v }}").unwrap();
        let value = vars(&[("v", json!("<a b>"))]);

        let cases = [
            (None, "<a b>"),
            (Some("html"), "&lt;a b&gt;"),
            (Some("html_attr"), "&lt;a b&gt;"),
            (Some("xml"), "&lt;a b&gt;"),
            (Some("url"), "%3Ca%20b%3E"),
            (Some("js"), "\\u003Ca\\u0020b\\u003E"),
            (Some("css"), "\\3C a\\20 b\\3E "),
        ];
        for (token, expected) in cases {
            let mut config = RenderConfig::default();
            if let Some(token) = token {
                config = config.with_auto_escape(token).unwrap();
            }
            let mut engine = engine_for(dir.path(), &config);
            assert_eq!(render(&mut engine, "v.html", &value), expected, "{token:?}");
        }
    }

    #[test]
    fn test_safe_values_are_not_escaped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("v.html"), "{{ v | safe }}").unwrap();
        let config = RenderConfig::default().with_auto_escape("url").unwrap();
        let mut engine = engine_for(dir.path(), &config);
        assert_eq!(
            render(&mut engine, "v.html", &vars(&[("v", json!("a b"))])),
            "a b"
        );
    }

    #[test]
    fn test_filters_functions_and_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("page.html"),
            "{{ name | shout }} {{ greet(name, '!') }} {{ site_name }}",
        )
        .unwrap();

        let shout = Filter::new("shout", |args: &[serde_json::Value]| {
            Ok(json!(args[0].as_str().unwrap_or_default().to_uppercase()))
        });
        let greet = Function::new("greet", |args: &[serde_json::Value]| {
            Ok(json!(format!(
                "hi {}{}",
                args[0].as_str().unwrap_or_default(),
                args[1].as_str().unwrap_or_default()
            )))
        });
        let site = ExtensionObject::new(Globals::new("site").with("site_name", "Example"));

        let mut engine = engine_for(dir.path(), &RenderConfig::default());
        engine.register_filter(&shout).unwrap();
        engine.register_function(&greet).unwrap();
        engine.register_extension(&site).unwrap();

        let out = render(&mut engine, "page.html", &vars(&[("name", json!("ann"))]));
        assert_eq!(out, "ANN hi ann! Example");
        assert_eq!(
            engine.registrations(),
            &[
                Registration::new(CapabilityKind::Filter, "shout"),
                Registration::new(CapabilityKind::Function, "greet"),
                Registration::new(CapabilityKind::Extension, "site"),
                Registration::new(CapabilityKind::Global, "site_name"),
            ]
        );
    }

    #[test]
    fn test_later_filter_shadows_earlier() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), "{{ 'x' | tag }}").unwrap();

        let mut engine = engine_for(dir.path(), &RenderConfig::default());
        engine
            .register_filter(&Filter::new("tag", |_: &[serde_json::Value]| Ok(json!("first"))))
            .unwrap();
        engine
            .register_filter(&Filter::new("tag", |_: &[serde_json::Value]| Ok(json!("second"))))
            .unwrap();
        assert_eq!(render(&mut engine, "page.html", &Variables::new()), "second");
    }

    #[test]
    fn test_failing_filter_is_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), "{{ 1 | boom }}").unwrap();

        let mut engine = engine_for(dir.path(), &RenderConfig::default());
        engine
            .register_filter(&Filter::new("boom", |_: &[serde_json::Value]| {
                Err(anyhow::anyhow!("kaboom"))
            }))
            .unwrap();
        engine.load("page.html").unwrap();
        let err = engine.render("page.html", &Variables::new()).unwrap_err();
        assert!(matches!(err, RenderError::Engine(ref msg) if msg.contains("kaboom")));
    }

    #[test]
    fn test_auto_reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "one").unwrap();

        let mut engine = engine_for(dir.path(), &RenderConfig::default());
        assert_eq!(render(&mut engine, "page.html", &Variables::new()), "one");
        fs::write(&path, "two").unwrap();
        assert_eq!(render(&mut engine, "page.html", &Variables::new()), "two");
    }

    #[test]
    fn test_without_auto_reload_keeps_compiled_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "one").unwrap();

        let config = RenderConfig::default().with_auto_reload(false);
        let mut engine = engine_for(dir.path(), &config);
        assert_eq!(render(&mut engine, "page.html", &Variables::new()), "one");
        fs::write(&path, "two").unwrap();
        assert_eq!(render(&mut engine, "page.html", &Variables::new()), "one");
    }

    #[test]
    fn test_cache_dir_shares_sources_between_engines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "cached").unwrap();
        let cache = Arc::new(MockCache::new());
        let config = RenderConfig::default()
            .with_auto_reload(false)
            .with_cache_dir("/compiled");

        let mut first = MiniJinjaEngine::new(dir.path(), &config, cache.clone()).unwrap();
        assert_eq!(render(&mut first, "page.html", &Variables::new()), "cached");
        assert_eq!(cache.len(), 1);

        fs::remove_file(&path).unwrap();
        let mut second = MiniJinjaEngine::new(dir.path(), &config, cache.clone()).unwrap();
        assert_eq!(render(&mut second, "page.html", &Variables::new()), "cached");
    }

    #[test]
    fn test_empty_cache_dir_disables_caching() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.html"), "x").unwrap();
        let cache = Arc::new(MockCache::new());

        let mut engine =
            MiniJinjaEngine::new(dir.path(), &RenderConfig::default(), cache.clone()).unwrap();
        render(&mut engine, "page.html", &Variables::new());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_plugin_dirs_extend_search_path() {
        let root = tempfile::tempdir().unwrap();
        let plugins = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join("page.html"),
            "{% include 'partial.html' %}",
        )
        .unwrap();
        fs::write(plugins.path().join("partial.html"), "from plugin").unwrap();

        let config = RenderConfig::default().add_extensions_dir(plugins.path());
        let mut engine = engine_for(root.path(), &config);
        assert_eq!(engine.search_dirs().len(), 2);
        assert_eq!(
            render(&mut engine, "page.html", &Variables::new()),
            "from plugin"
        );
    }
}
