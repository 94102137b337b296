//! Rendering configuration.
//!
//! [`RenderConfig`] is pure data plus validation: it never builds an engine.
//! It is assembled with chained setters, optionally seeded from YAML, and then
//! handed to an [`Adapter`](crate::Adapter), which owns it from then on. Every
//! view the adapter creates reads the same immutable value, so an engine that
//! already exists can never observe a later change.
//!
//! # Builder API
//!
//! ```rust
//! use pageview::{AutoEscape, DelimiterKind, RenderConfig};
//!
//! let config = RenderConfig::default()
//!     .with_delimiters(DelimiterKind::Variable, "[[", "]]")
//!     .with_cache_dir("/var/cache/views")
//!     .with_debug(false)
//!     .add_extensions_dir("/srv/app/plugins")
//!     .with_auto_escape("html")
//!     .unwrap();
//!
//! assert_eq!(config.auto_escape(), Some(AutoEscape::Html));
//! assert_eq!(config.delimiters(DelimiterKind::Variable).left, "[[");
//! ```
//!
//! # From YAML
//!
//! ```rust
//! use pageview::RenderConfig;
//!
//! let config = RenderConfig::from_yaml(r#"
//! cache_dir: /tmp/views
//! strict_variables: false
//! auto_escape: html
//! extensions_dirs: [/srv/plugins]
//! block_delimiters: { left: "<%", right: "%>" }
//! "#).unwrap();
//!
//! assert!(!config.strict_variables());
//! ```
//!
//! # Autoescape policy
//!
//! Exactly one escaping strategy is active at a time. Each successful call to
//! [`with_auto_escape`](RenderConfig::with_auto_escape) replaces the previous
//! strategy; an invalid token leaves nothing behind because the error consumes
//! the builder.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::capability::{Extension, ExtensionObject, Filter, Function};
use crate::error::ConfigError;

/// Autoescape tokens accepted by [`RenderConfig::with_auto_escape`].
pub const AUTO_ESCAPE_TOKENS: &[&str] = &["html", "css", "js", "url", "html_attr", "xml"];

/// Output-escaping strategy applied to every rendered value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AutoEscape {
    Html,
    Css,
    Js,
    Url,
    HtmlAttr,
    Xml,
}

impl AutoEscape {
    pub const ALL: [AutoEscape; 6] = [
        AutoEscape::Html,
        AutoEscape::Css,
        AutoEscape::Js,
        AutoEscape::Url,
        AutoEscape::HtmlAttr,
        AutoEscape::Xml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AutoEscape::Html => "html",
            AutoEscape::Css => "css",
            AutoEscape::Js => "js",
            AutoEscape::Url => "url",
            AutoEscape::HtmlAttr => "html_attr",
            AutoEscape::Xml => "xml",
        }
    }
}

impl fmt::Display for AutoEscape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoEscape {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AutoEscape::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| ConfigError::invalid("autoescape", s, AUTO_ESCAPE_TOKENS))
    }
}

impl TryFrom<String> for AutoEscape {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AutoEscape> for String {
    fn from(value: AutoEscape) -> Self {
        value.as_str().to_string()
    }
}

/// Which template construct a delimiter pair marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterKind {
    Variable,
    Block,
    Comment,
}

/// Left and right tokens around a template construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub left: String,
    pub right: String,
}

impl Delimiters {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Complete rendering configuration.
///
/// `Default` yields the documented defaults: `{{ }}`, `{% %}` and `{# #}`
/// delimiters, no cache directory, debug, auto-reload and strict variables on,
/// `utf-8` charset, autoescape off, and no registered capabilities.
///
/// Capability lists (filters, functions, extensions) are append-only and keep
/// insertion order; they are not part of the YAML representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    variable_delimiters: Delimiters,
    block_delimiters: Delimiters,
    comment_delimiters: Delimiters,
    cache_dir: PathBuf,
    debug: bool,
    auto_reload: bool,
    strict_variables: bool,
    charset: String,
    auto_escape: Option<AutoEscape>,
    extensions_dirs: Vec<PathBuf>,
    #[serde(skip)]
    filters: Vec<Filter>,
    #[serde(skip)]
    functions: Vec<Function>,
    #[serde(skip)]
    extensions: Vec<ExtensionObject>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            variable_delimiters: Delimiters::new("{{", "}}"),
            block_delimiters: Delimiters::new("{%", "%}"),
            comment_delimiters: Delimiters::new("{#", "#}"),
            cache_dir: PathBuf::new(),
            debug: true,
            auto_reload: true,
            strict_variables: true,
            charset: "utf-8".to_string(),
            auto_escape: None,
            extensions_dirs: Vec::new(),
            filters: Vec::new(),
            functions: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

impl RenderConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the data fields of a configuration from YAML.
    ///
    /// Missing keys keep their defaults; unknown keys are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents, unknown keys,
    /// or tokens outside an allowed set.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Serializes the data fields back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Returns a complete copy of the current configuration.
    pub fn snapshot(&self) -> RenderConfig {
        self.clone()
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    /// Sets the delimiter pair for one kind of construct.
    ///
    /// Tokens are not checked here. Pairs the engine cannot use are reported
    /// when a view is created.
    pub fn with_delimiters(
        mut self,
        kind: DelimiterKind,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        let pair = Delimiters::new(left, right);
        match kind {
            DelimiterKind::Variable => self.variable_delimiters = pair,
            DelimiterKind::Block => self.block_delimiters = pair,
            DelimiterKind::Comment => self.comment_delimiters = pair,
        }
        self
    }

    /// Sets the compiled-output cache directory. An empty path disables caching.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// When enabled, template sources are re-read on every load.
    pub fn with_auto_reload(mut self, auto_reload: bool) -> Self {
        self.auto_reload = auto_reload;
        self
    }

    /// When enabled, referencing an undefined variable fails the render.
    pub fn with_strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Appends one plugin search directory.
    pub fn add_extensions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extensions_dirs.push(dir.into());
        self
    }

    /// Appends several plugin search directories, in order.
    pub fn add_extensions_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.extensions_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Activates the escaping strategy named by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfigurationValue`] when `token` is not
    /// one of [`AUTO_ESCAPE_TOKENS`].
    pub fn with_auto_escape(self, token: &str) -> Result<Self, ConfigError> {
        let strategy = token.parse()?;
        Ok(self.with_auto_escape_strategy(strategy))
    }

    pub fn with_auto_escape_strategy(mut self, strategy: AutoEscape) -> Self {
        self.auto_escape = Some(strategy);
        self
    }

    pub fn without_auto_escape(mut self) -> Self {
        self.auto_escape = None;
        self
    }

    pub fn add_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn add_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    pub fn add_extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(ExtensionObject::new(extension));
        self
    }

    pub fn add_extension_object(mut self, extension: ExtensionObject) -> Self {
        self.extensions.push(extension);
        self
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    pub fn delimiters(&self, kind: DelimiterKind) -> &Delimiters {
        match kind {
            DelimiterKind::Variable => &self.variable_delimiters,
            DelimiterKind::Block => &self.block_delimiters,
            DelimiterKind::Comment => &self.comment_delimiters,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Whether a compiled-output cache directory is configured.
    pub fn has_cache_dir(&self) -> bool {
        !self.cache_dir.as_os_str().is_empty()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn auto_reload(&self) -> bool {
        self.auto_reload
    }

    pub fn strict_variables(&self) -> bool {
        self.strict_variables
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn auto_escape(&self) -> Option<AutoEscape> {
        self.auto_escape
    }

    pub fn extensions_dirs(&self) -> &[PathBuf] {
        &self.extensions_dirs
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn extensions(&self) -> &[ExtensionObject] {
        &self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Globals;
    use serde_json::{json, Value};

    #[test]
    fn test_default_values() {
        let config = RenderConfig::default();
        assert_eq!(
            config.delimiters(DelimiterKind::Variable),
            &Delimiters::new("{{", "}}")
        );
        assert_eq!(
            config.delimiters(DelimiterKind::Block),
            &Delimiters::new("{%", "%}")
        );
        assert_eq!(
            config.delimiters(DelimiterKind::Comment),
            &Delimiters::new("{#", "#}")
        );
        assert_eq!(config.charset(), "utf-8");
        assert!(config.strict_variables());
        assert!(config.auto_reload());
        assert!(config.debug());
        assert_eq!(config.cache_dir(), Path::new(""));
        assert!(!config.has_cache_dir());
        assert!(config.filters().is_empty());
        assert!(config.functions().is_empty());
        assert!(config.extensions().is_empty());
        assert!(config.extensions_dirs().is_empty());
        assert_eq!(config.auto_escape(), None);
    }

    #[test]
    fn test_setters_round_trip_through_getters() {
        let config = RenderConfig::default()
            .with_auto_escape("html")
            .unwrap()
            .with_auto_reload(false)
            .with_cache_dir("/my/cache/dir")
            .with_charset("windows-1251")
            .with_debug(false)
            .with_delimiters(DelimiterKind::Block, "[[", "]]")
            .with_delimiters(DelimiterKind::Variable, "[[", "]]")
            .with_delimiters(DelimiterKind::Comment, "[[", "]]")
            .add_extensions_dirs(["/dir1", "/dir2"])
            .with_strict_variables(false);

        assert_eq!(config.auto_escape(), Some(AutoEscape::Html));
        assert!(!config.auto_reload());
        assert_eq!(config.cache_dir(), Path::new("/my/cache/dir"));
        assert_eq!(config.charset(), "windows-1251");
        assert!(!config.debug());
        for kind in [
            DelimiterKind::Block,
            DelimiterKind::Variable,
            DelimiterKind::Comment,
        ] {
            assert_eq!(config.delimiters(kind).left, "[[");
            assert_eq!(config.delimiters(kind).right, "]]");
        }
        assert_eq!(
            config.extensions_dirs(),
            &[PathBuf::from("/dir1"), PathBuf::from("/dir2")]
        );
        assert!(!config.strict_variables());
    }

    #[test]
    fn test_extensions_dirs_are_cumulative() {
        let config = RenderConfig::default()
            .add_extensions_dir("/a")
            .add_extensions_dir("/b")
            .add_extensions_dirs(vec!["/c", "/d"]);
        let dirs: Vec<&str> = config
            .extensions_dirs()
            .iter()
            .map(|p| p.to_str().unwrap())
            .collect();
        assert_eq!(dirs, ["/a", "/b", "/c", "/d"]);
    }

    #[test]
    fn test_auto_escape_last_call_wins() {
        let config = RenderConfig::default()
            .with_auto_escape("html")
            .unwrap()
            .with_auto_escape("js")
            .unwrap();
        assert_eq!(config.auto_escape(), Some(AutoEscape::Js));
        assert_eq!(config.without_auto_escape().auto_escape(), None);
    }

    #[test]
    fn test_auto_escape_rejects_unknown_token() {
        let err = RenderConfig::default().with_auto_escape("latex").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidConfigurationValue { field: "autoescape", ref value, .. } if value == "latex"
        ));
    }

    #[test]
    fn test_capability_lists_keep_duplicates_and_order() {
        let upper = Filter::new("upper", |args: &[Value]| Ok(args[0].clone()));
        let config = RenderConfig::default()
            .add_filter(upper.clone())
            .add_filter(Filter::new("trim", |args: &[Value]| Ok(args[0].clone())))
            .add_filter(upper.clone())
            .add_function(Function::new("now", |_: &[Value]| Ok(json!(0))))
            .add_extension(Globals::new("site"));

        let names: Vec<&str> = config.filters().iter().map(Filter::name).collect();
        assert_eq!(names, ["upper", "trim", "upper"]);
        assert_eq!(config.functions()[0].name(), "now");
        assert_eq!(config.extensions()[0].name(), "site");
    }

    #[test]
    fn test_snapshot_equals_source() {
        let config = RenderConfig::default()
            .with_cache_dir("/cache")
            .add_filter(Filter::new("id", |args: &[Value]| Ok(args[0].clone())));
        assert_eq!(config.snapshot(), config);
        assert_ne!(config.snapshot(), RenderConfig::default());
    }

    #[test]
    fn test_from_yaml_overrides_defaults() {
        let config = RenderConfig::from_yaml(
            r#"
cache_dir: /tmp/compiled
debug: false
auto_escape: html_attr
charset: iso-8859-1
extensions_dirs:
  - /plugins/a
  - /plugins/b
variable_delimiters:
  left: "[["
  right: "]]"
"#,
        )
        .unwrap();

        assert_eq!(config.cache_dir(), Path::new("/tmp/compiled"));
        assert!(!config.debug());
        assert!(config.auto_reload());
        assert_eq!(config.auto_escape(), Some(AutoEscape::HtmlAttr));
        assert_eq!(config.charset(), "iso-8859-1");
        assert_eq!(config.extensions_dirs().len(), 2);
        assert_eq!(config.delimiters(DelimiterKind::Variable).left, "[[");
        assert_eq!(config.delimiters(DelimiterKind::Block).left, "{%");
    }

    #[test]
    fn test_from_yaml_empty_is_default() {
        assert_eq!(RenderConfig::from_yaml("").unwrap(), RenderConfig::default());
    }

    #[test]
    fn test_from_yaml_rejects_bad_autoescape() {
        let err = RenderConfig::from_yaml("auto_escape: latex").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref msg) if msg.contains("latex")));
    }

    #[test]
    fn test_from_yaml_rejects_unknown_keys() {
        assert!(RenderConfig::from_yaml("cache_directory: /tmp").is_err());
    }

    #[test]
    fn test_yaml_round_trip_of_data_fields() {
        let config = RenderConfig::default()
            .with_auto_escape("url")
            .unwrap()
            .add_extensions_dir("/plugins");
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("auto_escape: url"));
        assert_eq!(RenderConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_from_file_reports_missing_path() {
        let err = RenderConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
