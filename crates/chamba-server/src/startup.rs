//! Startup sequence.
//!
//! Migrations run first, then every module's `Migrated` event is
//! dispatched in [`Module::ALL`] order: role bootstrap for
//! authentication, manifest seeds for content modules. Seed media is
//! copied last, once per media tag.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chamba_core::events::{DomainEvent, Module};
use chamba_db::repository::{
    SurrealAccountRepository, SurrealPermissionGroupRepository, SurrealProfileRepository,
    SurrealUserTypeRepository,
};
use chamba_db::{SeedLedger, SeedOutcome, run_migrations};
use chamba_roles::{RoleSync, RoleSyncConfig};
use surrealdb::{Connection, Surreal};
use tracing::{info, warn};

use crate::config::{SeedEntry, SeedManifest};
use crate::media::copy_seed_media;

pub type SurrealRoleSync<C> = RoleSync<
    SurrealAccountRepository<C>,
    SurrealPermissionGroupRepository<C>,
    SurrealUserTypeRepository<C>,
    SurrealProfileRepository<C>,
>;

pub fn role_sync<C: Connection>(db: &Surreal<C>, config: RoleSyncConfig) -> SurrealRoleSync<C> {
    RoleSync::new(
        SurrealAccountRepository::new(db.clone()),
        SurrealPermissionGroupRepository::new(db.clone()),
        SurrealUserTypeRepository::new(db.clone()),
        SurrealProfileRepository::new(db.clone()),
        config,
    )
}

/// What a startup run did, by ledger tag.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StartupReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub missing: Vec<String>,
    /// Files copied, or `None` when the media step did not run.
    pub media_copied: Option<usize>,
}

pub async fn run<C: Connection>(
    db: &Surreal<C>,
    manifest: &SeedManifest,
    media_root: Option<&Path>,
) -> anyhow::Result<StartupReport> {
    run_migrations(db).await.context("schema migrations failed")?;

    let roles = role_sync(db, RoleSyncConfig::default());
    let ledger = SeedLedger::new(db.clone());
    let mut report = StartupReport::default();

    for module in Module::ALL {
        roles
            .handle(&DomainEvent::Migrated { module })
            .await
            .with_context(|| format!("post-migrate handling failed for {module}"))?;

        for entry in manifest.seeds_for(module) {
            let tag = entry.effective_tag();
            match apply_seed(&ledger, manifest, entry, &tag).await? {
                SeedOutcome::Applied { .. } => report.applied.push(tag),
                SeedOutcome::AlreadyApplied => report.skipped.push(tag),
                SeedOutcome::SourceMissing { .. } => report.missing.push(tag),
            }
        }
    }

    report.media_copied = seed_media(&ledger, manifest, media_root).await?;

    info!(
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        missing = report.missing.len(),
        "Startup complete"
    );
    Ok(report)
}

async fn apply_seed<C: Connection>(
    ledger: &SeedLedger<C>,
    manifest: &SeedManifest,
    entry: &SeedEntry,
    tag: &str,
) -> anyhow::Result<SeedOutcome> {
    ledger
        .apply(tag, &manifest.loader(entry))
        .await
        .with_context(|| format!("seeding {} failed", entry.module))
}

/// Apply the manifest seed declared with `tag`, optionally forgetting it
/// first so it runs again.
pub async fn run_seed<C: Connection>(
    db: &Surreal<C>,
    manifest: &SeedManifest,
    tag: &str,
    forget: bool,
) -> anyhow::Result<SeedOutcome> {
    let Some(entry) = manifest.find_seed(tag) else {
        bail!("no seed with tag {tag} in the manifest");
    };

    let ledger = SeedLedger::new(db.clone());
    if forget && ledger.forget(tag).await? {
        info!(tag, "Forgot seed tag");
    }

    apply_seed(&ledger, manifest, entry, tag).await
}

/// `--media-root` wins over the manifest's `media_root`, which is
/// relative to the manifest directory.
pub fn resolve_media_root(manifest: &SeedManifest, cli: Option<&Path>) -> Option<PathBuf> {
    cli.map(Path::to_path_buf).or_else(|| {
        manifest
            .media
            .as_ref()
            .and_then(|m| m.media_root.as_ref())
            .map(|root| manifest.base_dir.join(root))
    })
}

async fn seed_media<C: Connection>(
    ledger: &SeedLedger<C>,
    manifest: &SeedManifest,
    media_root: Option<&Path>,
) -> anyhow::Result<Option<usize>> {
    let Some(media) = &manifest.media else {
        return Ok(None);
    };
    let Some(root) = resolve_media_root(manifest, media_root) else {
        warn!(tag = %media.tag, "No media root configured, seed media not copied");
        return Ok(None);
    };

    if ledger.is_applied(&media.tag).await? {
        info!(tag = %media.tag, "Seed media already copied, skipping");
        return Ok(None);
    }

    let copied = copy_seed_media(&manifest.base_dir, &root, &media.pairs, false)
        .with_context(|| format!("copying seed media into {}", root.display()))?;

    if let Err(e) = ledger.mark_applied(&media.tag).await {
        if !ledger.is_applied(&media.tag).await? {
            return Err(e).context("recording seed media tag");
        }
    }
    Ok(Some(copied))
}
