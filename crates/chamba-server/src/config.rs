//! Seed manifest: which fixtures each module seeds, under which ledger tag.

use std::fs;
use std::path::{Path, PathBuf};

use chamba_core::events::Module;
use chamba_db::{FixtureLoader, FixtureResolver, FixtureSource};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read manifest {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("invalid manifest {path}: {error}")]
    Parse {
        path: PathBuf,
        #[source]
        error: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedManifest {
    /// Directories searched for named fixtures, relative to the manifest.
    #[serde(default)]
    pub fixture_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub seeds: Vec<SeedEntry>,

    #[serde(default)]
    pub media: Option<MediaConfig>,

    /// Directory relative paths are anchored at.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// One seeding batch owned by a module.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub module: Module,
    pub tag: String,
    /// Fixture paths or bare fixture names, applied in order.
    pub fixtures: Vec<String>,
    /// Environment variable that overrides `tag` when set and non-empty.
    #[serde(default)]
    pub tag_env: Option<String>,
}

impl SeedEntry {
    pub fn effective_tag(&self) -> String {
        self.resolve_tag(|name| std::env::var(name).ok())
    }

    fn resolve_tag(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        self.tag_env
            .as_deref()
            .and_then(lookup)
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .unwrap_or_else(|| self.tag.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub tag: String,
    /// Overridden by `--media-root` / `CHAMBA_MEDIA_ROOT`.
    #[serde(default)]
    pub media_root: Option<PathBuf>,
    #[serde(default)]
    pub pairs: Vec<MediaPair>,
}

/// Copy the files directly inside `src` into `media_root/dst`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaPair {
    pub src: PathBuf,
    pub dst: PathBuf,
}

impl SeedManifest {
    /// Read the manifest at `path`. A missing file yields an empty manifest.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "Seed manifest not found, no seeds configured");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self::parse(&content, base_dir).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    pub fn parse(content: &str, base_dir: PathBuf) -> Result<Self, toml::de::Error> {
        let mut manifest: SeedManifest = toml::from_str(content)?;
        manifest.base_dir = base_dir;
        Ok(manifest)
    }

    /// Seeds owned by `module`, in manifest order.
    pub fn seeds_for(&self, module: Module) -> impl Iterator<Item = &SeedEntry> {
        self.seeds.iter().filter(move |s| s.module == module)
    }

    /// The seed declared with, or currently resolving to, `tag`.
    pub fn find_seed(&self, tag: &str) -> Option<&SeedEntry> {
        self.seeds
            .iter()
            .find(|s| s.tag == tag || s.effective_tag() == tag)
    }

    pub fn loader(&self, entry: &SeedEntry) -> FixtureLoader {
        FixtureLoader::new(
            FixtureResolver::new(&self.base_dir, self.fixture_dirs.clone()),
            entry
                .fixtures
                .iter()
                .map(|f| FixtureSource::parse(f))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
fixture_dirs = ["fixtures"]

[[seeds]]
module = "cooperaciones"
tag = "coops:v3"
fixtures = ["cooperaciones/coops_seed.json"]

[[seeds]]
module = "eventos"
tag = "eventos:v5"
fixtures = ["festivales", "talleres"]
tag_env = "EVENTOS_SEED_TAG"

[[seeds]]
module = "cooperaciones"
tag = "coops:fotos:v1"
fixtures = ["coops_fotos"]

[media]
tag = "coops:media:v1"
pairs = [{ src = "cooperaciones/static/images/coops/logos", dst = "coops/logos" }]
"#;

    #[test]
    fn parses_seeds_in_order() {
        let manifest = SeedManifest::parse(MANIFEST, PathBuf::from("/srv/site")).unwrap();

        assert_eq!(manifest.fixture_dirs, vec![PathBuf::from("fixtures")]);
        assert_eq!(manifest.base_dir, PathBuf::from("/srv/site"));

        let coops: Vec<&str> = manifest
            .seeds_for(Module::Cooperaciones)
            .map(|s| s.tag.as_str())
            .collect();
        assert_eq!(coops, vec!["coops:v3", "coops:fotos:v1"]);
        assert_eq!(manifest.seeds_for(Module::Blog).count(), 0);

        let media = manifest.media.unwrap();
        assert_eq!(media.tag, "coops:media:v1");
        assert_eq!(media.pairs[0].dst, PathBuf::from("coops/logos"));
        assert_eq!(media.media_root, None);
    }

    #[test]
    fn unknown_module_is_rejected() {
        let err = SeedManifest::parse(
            r#"[[seeds]]
module = "foro"
tag = "foro:v1"
fixtures = []"#,
            PathBuf::new(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn empty_manifest_has_no_seeds() {
        let manifest = SeedManifest::parse("", PathBuf::new()).unwrap();
        assert!(manifest.seeds.is_empty());
        assert!(manifest.media.is_none());
    }

    #[test]
    fn tag_env_overrides_tag() {
        let manifest = SeedManifest::parse(MANIFEST, PathBuf::new()).unwrap();
        let eventos = &manifest.seeds[1];

        let tag = eventos.resolve_tag(|name| {
            (name == "EVENTOS_SEED_TAG").then(|| "eventos:v6".to_string())
        });
        assert_eq!(tag, "eventos:v6");

        assert_eq!(eventos.resolve_tag(|_| Some("  ".into())), "eventos:v5");
        assert_eq!(eventos.resolve_tag(|_| None), "eventos:v5");
        // No tag_env: the environment is never consulted.
        assert_eq!(manifest.seeds[0].resolve_tag(|_| Some("x".into())), "coops:v3");
    }

    #[test]
    fn missing_manifest_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = SeedManifest::load(&dir.path().join("seeds.toml")).unwrap();
        assert!(manifest.seeds.is_empty());
    }

    #[test]
    fn load_anchors_paths_at_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.toml");
        fs::write(&path, MANIFEST).unwrap();

        let manifest = SeedManifest::load(&path).unwrap();
        assert_eq!(manifest.base_dir, dir.path());
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.toml");
        fs::write(&path, "seeds = 3").unwrap();

        let err = SeedManifest::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
