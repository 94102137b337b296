//! Template source resolution across a root and plugin directories.
//!
//! Names are resolved against the template root first, then against each
//! plugin search directory in registration order; the first match wins.
//! Within one directory the name is tried verbatim, then with each of
//! [`TEMPLATE_EXTENSIONS`] appended, so `"page"` finds `page.html`.
//!
//! Names that are absolute or contain a `..` segment never resolve.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::collaborators::TemplateCache;

/// Extensions tried, in priority order, when a name does not match verbatim.
pub const TEMPLATE_EXTENSIONS: &[&str] = &[".html", ".twig", ".jinja", ".jinja2", ".j2", ".txt"];

#[derive(Clone)]
struct CacheBinding {
    store: Arc<dyn TemplateCache>,
    namespace: String,
    auto_reload: bool,
}

/// Ordered list of template directories with an optional source cache.
#[derive(Clone)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
    cache: Option<CacheBinding>,
}

impl SearchPath {
    /// Creates a search path starting at `root`, followed by `extra` in order.
    pub fn new<I, P>(root: impl Into<PathBuf>, extra: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut dirs = vec![root.into()];
        dirs.extend(extra.into_iter().map(Into::into));
        Self { dirs, cache: None }
    }

    /// Writes loaded sources through to `store`, namespaced by `cache_dir`
    /// and every search directory in order.
    ///
    /// Unless `auto_reload` is set, cached sources are served without
    /// touching the filesystem.
    pub fn with_cache(
        mut self,
        store: Arc<dyn TemplateCache>,
        cache_dir: &Path,
        auto_reload: bool,
    ) -> Self {
        let dirs: Vec<String> = self
            .dirs
            .iter()
            .map(|dir| dir.display().to_string())
            .collect();
        let namespace = format!("{}::{}", cache_dir.display(), dirs.join("|"));
        self.cache = Some(CacheBinding {
            store,
            namespace,
            auto_reload,
        });
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// The cache key used for `name`, if caching is enabled.
    pub fn cache_key(&self, name: &str) -> Option<String> {
        self.cache
            .as_ref()
            .map(|binding| format!("{}::{}", binding.namespace, name))
    }

    /// Finds the file backing `name`.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !is_safe_name(name) {
            return None;
        }
        self.dirs.iter().find_map(|dir| {
            std::iter::once("")
                .chain(TEMPLATE_EXTENSIONS.iter().copied())
                .map(|ext| dir.join(format!("{name}{ext}")))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Reads the source for `name`; `Ok(None)` when it does not exist.
    pub fn load(&self, name: &str) -> io::Result<Option<String>> {
        let key = self.cache_key(name);

        if let (Some(binding), Some(key)) = (&self.cache, &key) {
            if !binding.auto_reload {
                if let Some(source) = binding.store.get(key) {
                    tracing::trace!(template = name, "template source served from cache");
                    return Ok(Some(source));
                }
            }
        }

        let Some(path) = self.resolve(name) else {
            return Ok(None);
        };
        let source = fs::read_to_string(&path)?;
        tracing::trace!(template = name, path = %path.display(), "template source read");

        if let (Some(binding), Some(key)) = (&self.cache, &key) {
            binding.store.set(key, source.clone());
        }
        Ok(Some(source))
    }
}

fn is_safe_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
