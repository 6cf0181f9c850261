//! Module loading and source discovery.
//!
//! The engine does not assume anything about how plugin code comes into the
//! process — that is the [`ModuleLoader`] collaborator's business. What the
//! engine owns is the *shape* of loading: a plugin tree is walked into
//! [`PluginSource`]s, each source is imported into zero-or-more
//! [`PluginFactory`]s, and failures are isolated per source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::LoadError;
use crate::plugin::PluginFactory;

/// A loadable module location inside the plugin tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSource {
    /// Registry identity: `"pack/file.ext"`, or just `"pack"` for a pack
    /// with its own entry point.
    pub key: String,
    /// Filesystem location.
    pub path: PathBuf,
}

impl PluginSource {
    /// Creates a source from its key and path.
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
        }
    }
}

/// Module-loading collaborator.
///
/// An implementation maps a [`PluginSource`] to the plugin factories it
/// exports. A single source may export any number of plugins — callers must
/// never assume exactly one.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Whether this loader recognizes `path` as a loadable module. Used by
    /// discovery and by the hot-reload watcher to filter new files.
    fn matches(&self, _path: &Path) -> bool {
        true
    }

    /// Imports the module at `source`, returning its plugin factories.
    async fn load_module(&self, source: &PluginSource) -> Result<Vec<PluginFactory>, LoadError>;
}

/// Walks the plugin root and returns every loadable source.
///
/// Each subdirectory of `root` is a pack. A pack containing an entry-point
/// file (named `index` with any extension) contributes a single source keyed
/// by the pack name; otherwise every regular file the loader recognizes is
/// its own source, keyed `"pack/file"`.
pub async fn discover(
    root: &Path,
    loader: &dyn ModuleLoader,
) -> Result<Vec<PluginSource>, LoadError> {
    let mut sources = Vec::new();
    let mut packs = fs::read_dir(root).await?;

    while let Some(pack) = packs.next_entry().await? {
        if !pack.file_type().await?.is_dir() {
            continue;
        }
        let pack_name = pack.file_name().to_string_lossy().into_owned();

        let mut files = Vec::new();
        let mut entry_point = None;
        let mut apps = fs::read_dir(pack.path()).await?;
        while let Some(app) = apps.next_entry().await? {
            if !app.file_type().await?.is_file() {
                continue;
            }
            let file_name = app.file_name().to_string_lossy().into_owned();
            let stem = file_name.rsplit_once('.').map_or(file_name.as_str(), |(s, _)| s);
            if stem == "index" {
                entry_point = Some(app.path());
            }
            files.push((file_name, app.path()));
        }

        if let Some(path) = entry_point {
            sources.push(PluginSource::new(pack_name, path));
            continue;
        }

        files.sort();
        for (file_name, path) in files {
            if loader.matches(&path) {
                sources.push(PluginSource::new(format!("{pack_name}/{file_name}"), path));
            }
        }
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AnyLoader;

    #[async_trait]
    impl ModuleLoader for AnyLoader {
        async fn load_module(
            &self,
            _source: &PluginSource,
        ) -> Result<Vec<PluginFactory>, LoadError> {
            Ok(Vec::new())
        }
    }

    struct TomlOnly;

    #[async_trait]
    impl ModuleLoader for TomlOnly {
        fn matches(&self, path: &Path) -> bool {
            path.extension().is_some_and(|e| e == "toml")
        }

        async fn load_module(
            &self,
            _source: &PluginSource,
        ) -> Result<Vec<PluginFactory>, LoadError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn pack_with_entry_point_is_one_source() {
        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("weather");
        std::fs::create_dir(&pack).unwrap();
        std::fs::write(pack.join("index.toml"), "").unwrap();
        std::fs::write(pack.join("other.toml"), "").unwrap();

        let sources = discover(dir.path(), &AnyLoader).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].key, "weather");
        assert!(sources[0].path.ends_with("index.toml"));
    }

    #[tokio::test]
    async fn plain_pack_yields_one_source_per_recognized_file() {
        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("tools");
        std::fs::create_dir(&pack).unwrap();
        std::fs::write(pack.join("a.toml"), "").unwrap();
        std::fs::write(pack.join("b.toml"), "").unwrap();
        std::fs::write(pack.join("readme.md"), "").unwrap();

        let mut sources = discover(dir.path(), &TomlOnly).await.unwrap();
        sources.sort_by(|a, b| a.key.cmp(&b.key));
        let keys: Vec<_> = sources.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["tools/a.toml", "tools/b.toml"]);
    }

    #[tokio::test]
    async fn top_level_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stray.toml"), "").unwrap();

        let sources = discover(dir.path(), &AnyLoader).await.unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn missing_root_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        let err = discover(&gone, &AnyLoader).await;
        assert!(matches!(err, Err(LoadError::Io(_))));
    }
}
