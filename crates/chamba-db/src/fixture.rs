//! Fixture sources and payload parsing.
//!
//! A fixture file is a JSON array of records in the `loaddata` layout:
//!
//! ```json
//! [{ "model": "cooperaciones.cooperacion", "pk": 1, "fields": { "nombre": "..." } }]
//! ```
//!
//! Each record lands in the table `<app_label>_<model>` under record id
//! `pk`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::ledger::SeedLoader;

/// Why a fixture batch could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Recoverable: the batch is skipped and retried on the next run.
    #[error("fixture source not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("malformed fixture {fixture}: {reason}")]
    Malformed { fixture: String, reason: String },

    #[error("failed to read fixture {}: {error}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

/// Where one fixture payload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureSource {
    /// A file path, used as given.
    Path(PathBuf),
    /// A bare fixture name (`"festivales"`), looked up as `<name>.json` in
    /// the resolver's directories.
    Named(String),
}

impl FixtureSource {
    /// Interpret a manifest entry: anything with a path separator or a
    /// `.json` extension is a path, otherwise it is a fixture name.
    pub fn parse(entry: &str) -> Self {
        if entry.contains('/') || entry.contains('\\') || entry.ends_with(".json") {
            FixtureSource::Path(PathBuf::from(entry))
        } else {
            FixtureSource::Named(entry.to_string())
        }
    }
}

/// Resolves [`FixtureSource`]s to files.
#[derive(Debug, Clone, Default)]
pub struct FixtureResolver {
    base_dir: PathBuf,
    dirs: Vec<PathBuf>,
}

impl FixtureResolver {
    /// `base_dir` anchors relative paths; `dirs` are searched, in order,
    /// for named fixtures. Relative `dirs` are also anchored at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, dirs: Vec<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let dirs = dirs.into_iter().map(|d| base_dir.join(d)).collect();
        Self { base_dir, dirs }
    }

    pub fn resolve(&self, source: &FixtureSource) -> Result<PathBuf, LoadError> {
        match source {
            FixtureSource::Path(path) => {
                let path = self.base_dir.join(path);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(LoadError::SourceMissing(path))
                }
            }
            FixtureSource::Named(name) => {
                let file_name = format!("{name}.json");
                self.dirs
                    .iter()
                    .map(|dir| dir.join(&file_name))
                    .find(|candidate| candidate.is_file())
                    .ok_or_else(|| LoadError::SourceMissing(PathBuf::from(file_name)))
            }
        }
    }
}

/// One entity record ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureRecord {
    pub table: String,
    /// Integer or string record id.
    pub id: Value,
    pub fields: Value,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    model: String,
    pk: Value,
    #[serde(default)]
    fields: Option<Value>,
}

/// Parse one fixture payload. `fixture` names the payload in errors.
pub fn parse_fixture(fixture: &str, content: &str) -> Result<Vec<FixtureRecord>, LoadError> {
    let malformed = |reason: String| LoadError::Malformed {
        fixture: fixture.to_string(),
        reason,
    };

    let raw: Vec<RawRecord> =
        serde_json::from_str(content).map_err(|e| malformed(e.to_string()))?;

    raw.into_iter()
        .enumerate()
        .map(|(index, record)| {
            let table = table_for_model(&record.model)
                .ok_or_else(|| malformed(format!("record {index}: invalid model '{}'", record.model)))?;
            if is_reserved_table(&table) {
                return Err(malformed(format!(
                    "record {index}: model '{}' maps to internal table {table}",
                    record.model
                )));
            }

            let id = match record.pk {
                Value::Number(n) if n.is_i64() || n.is_u64() => Value::Number(n),
                Value::String(s) if !s.is_empty() => Value::String(s),
                other => return Err(malformed(format!("record {index}: invalid pk {other}"))),
            };

            let fields = match record.fields {
                None => Value::Object(Default::default()),
                Some(Value::Object(map)) => Value::Object(map),
                Some(_) => {
                    return Err(malformed(format!("record {index}: fields must be an object")));
                }
            };

            Ok(FixtureRecord { table, id, fields })
        })
        .collect()
}

/// `"app_label.model"` -> `"app_label_model"`.
fn table_for_model(model: &str) -> Option<String> {
    let model = model.to_ascii_lowercase();
    let (app_label, name) = model.split_once('.')?;
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    };
    (valid(app_label) && valid(name)).then(|| format!("{app_label}_{name}"))
}

/// Tables owned by the ledger, the migration runner and role
/// synchronization. Fixtures may not write into them.
const RESERVED_TABLES: &[&str] = &[
    "seed_run",
    "account",
    "perm_group",
    "member_of",
    "user_type",
    "user_profile",
];

pub(crate) fn is_reserved_table(table: &str) -> bool {
    table.starts_with('_') || RESERVED_TABLES.contains(&table)
}

/// Loads an ordered list of fixture sources as one batch.
///
/// Every source is resolved before any is read, so a single missing file
/// skips the whole batch.
#[derive(Debug, Clone)]
pub struct FixtureLoader {
    resolver: FixtureResolver,
    sources: Vec<FixtureSource>,
}

impl FixtureLoader {
    pub fn new(resolver: FixtureResolver, sources: Vec<FixtureSource>) -> Self {
        Self { resolver, sources }
    }

    fn read(path: &Path) -> Result<Vec<FixtureRecord>, LoadError> {
        let content = fs::read_to_string(path).map_err(|error| LoadError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        parse_fixture(&path.display().to_string(), &content)
    }
}

impl SeedLoader for FixtureLoader {
    fn load(&self) -> Result<Vec<FixtureRecord>, LoadError> {
        let paths = self
            .sources
            .iter()
            .map(|source| self.resolver.resolve(source))
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::new();
        for path in &paths {
            records.extend(Self::read(path)?);
        }
        Ok(records)
    }
}
