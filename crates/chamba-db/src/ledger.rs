//! Idempotent seed ledger.
//!
//! A batch of fixture records is applied at most once per database. The
//! batch and its `seed_run` row are written in a single transaction, so
//! either every record of the batch exists and the tag is recorded, or
//! neither happens.
//!
//! The ledger row uses the tag itself as record id and the `tag` column
//! carries a UNIQUE index. When two processes race on the same unseen tag,
//! only one transaction can commit; the loser re-reads the ledger and
//! reports [`SeedOutcome::AlreadyApplied`].

use std::path::PathBuf;

use chamba_core::models::seed::SeedRecord;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::fixture::{FixtureRecord, LoadError, is_reserved_table};

const LEDGER_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS seed_run SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS tag ON TABLE seed_run TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE seed_run TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_seed_run_tag ON TABLE seed_run \
    COLUMNS tag UNIQUE;
";

const DDL_ATTEMPTS: u32 = 3;

/// Produces the records of one seeding batch.
///
/// Only invoked when the batch's tag is absent from the ledger.
pub trait SeedLoader {
    fn load(&self) -> Result<Vec<FixtureRecord>, LoadError>;
}

impl<F> SeedLoader for F
where
    F: Fn() -> Result<Vec<FixtureRecord>, LoadError>,
{
    fn load(&self) -> Result<Vec<FixtureRecord>, LoadError> {
        self()
    }
}

/// Result of [`SeedLedger::apply`] that is not a load failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The tag was already recorded; the loader did not run.
    AlreadyApplied,
    /// The batch was written and the tag recorded.
    Applied { records: usize },
    /// A fixture source does not exist. Nothing was written and the tag
    /// stays absent so a later run can retry.
    SourceMissing { source: PathBuf },
}

#[derive(Debug, SurrealValue)]
struct SeedRow {
    tag: String,
    applied_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// The `seed_run` ledger.
#[derive(Clone)]
pub struct SeedLedger<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SeedLedger<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Define the ledger table if needed. Processes starting together on a
    /// fresh database can conflict on the definition itself; the loser
    /// retries against the now-committed definition.
    async fn ensure_table(&self) -> Result<(), DbError> {
        let mut attempt = 1;
        loop {
            let result = match self.db.query(LEDGER_TABLE_DDL).await {
                Ok(response) => response.check().map(|_| ()).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= DDL_ATTEMPTS => {
                    return Err(DbError::Ledger(format!("seed ledger table: {e}")));
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Retrying seed ledger definition");
                    attempt += 1;
                }
            }
        }
    }

    /// Whether `tag` has been recorded.
    pub async fn is_applied(&self, tag: &str) -> Result<bool, DbError> {
        self.ensure_table().await?;

        let mut result = self
            .db
            .query("SELECT count() AS total FROM seed_run WHERE tag = $tag GROUP ALL")
            .bind(("tag", tag.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    /// Apply the batch produced by `loader` unless `tag` is already
    /// recorded.
    ///
    /// Malformed payloads and write failures (constraint violations,
    /// type assertions) abort the transaction and are returned as
    /// [`DbError::LoadFailure`].
    pub async fn apply<L: SeedLoader>(&self, tag: &str, loader: &L) -> Result<SeedOutcome, DbError> {
        if self.is_applied(tag).await? {
            info!(tag, "Seed already applied, skipping");
            return Ok(SeedOutcome::AlreadyApplied);
        }

        let records = match loader.load() {
            Ok(records) => records,
            Err(LoadError::SourceMissing(source)) => {
                warn!(tag, source = %source.display(), "Seed source missing, tag left unmarked");
                return Ok(SeedOutcome::SourceMissing { source });
            }
            Err(e) => {
                return Err(DbError::LoadFailure {
                    tag: tag.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if let Some(record) = records.iter().find(|r| is_reserved_table(&r.table)) {
            return Err(DbError::LoadFailure {
                tag: tag.to_string(),
                reason: format!("record targets internal table {}", record.table),
            });
        }

        let count = records.len();
        let batch = records
            .into_iter()
            .map(|record| {
                serde_json::json!({
                    "table": record.table,
                    "id": record.id,
                    "fields": record.fields,
                })
            })
            .collect::<Vec<_>>();

        let builder = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 FOR $record IN $batch { \
                     UPSERT type::record($record.table, $record.id) \
                     CONTENT $record.fields; \
                 }; \
                 CREATE type::record('seed_run', $tag) SET tag = $tag; \
                 COMMIT TRANSACTION;",
            )
            .bind(("batch", serde_json::Value::Array(batch)))
            .bind(("tag", tag.to_string()));

        let outcome = match builder.await {
            Ok(response) => response.check().map(|_| ()).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        if let Err(reason) = outcome {
            if self.is_applied(tag).await? {
                info!(tag, "Seed applied concurrently by another process");
                return Ok(SeedOutcome::AlreadyApplied);
            }
            return Err(DbError::LoadFailure {
                tag: tag.to_string(),
                reason,
            });
        }

        info!(tag, records = count, "Seed applied");
        Ok(SeedOutcome::Applied { records: count })
    }

    /// Record `tag` for work that is not a fixture batch (e.g. copying
    /// seed media). Fails if the tag is already present.
    pub async fn mark_applied(&self, tag: &str) -> Result<(), DbError> {
        self.ensure_table().await?;

        self.db
            .query("CREATE type::record('seed_run', $tag) SET tag = $tag")
            .bind(("tag", tag.to_string()))
            .await?
            .check()
            .map_err(|e| DbError::Ledger(format!("failed to mark seed {tag}: {e}")))?;

        info!(tag, "Seed tag marked");
        Ok(())
    }

    /// Remove `tag` from the ledger. Operator intervention only: the next
    /// run re-applies the batch. Returns whether the tag was present.
    pub async fn forget(&self, tag: &str) -> Result<bool, DbError> {
        let present = self.is_applied(tag).await?;
        if present {
            self.db
                .query("DELETE seed_run WHERE tag = $tag")
                .bind(("tag", tag.to_string()))
                .await?
                .check()
                .map_err(|e| DbError::Ledger(format!("failed to forget seed {tag}: {e}")))?;
            warn!(tag, "Seed tag removed from ledger");
        }
        Ok(present)
    }

    /// All recorded tags, oldest first.
    pub async fn list(&self) -> Result<Vec<SeedRecord>, DbError> {
        self.ensure_table().await?;

        let mut result = self
            .db
            .query("SELECT tag, applied_at FROM seed_run ORDER BY applied_at ASC, tag ASC")
            .await?;
        let rows: Vec<SeedRow> = result.take(0)?;

        Ok(rows
            .into_iter()
            .map(|row| SeedRecord {
                tag: row.tag,
                applied_at: row.applied_at,
            })
            .collect())
    }
}
