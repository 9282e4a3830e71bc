//! Chamba: migrations, idempotent seeding and role bootstrap for the
//! Chambalabamba site database.

mod config;
mod media;
mod startup;

use std::path::PathBuf;

use anyhow::{Context, bail};
use chamba_db::{DbConfig, DbManager, SeedOutcome};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::SeedManifest;

#[derive(Parser)]
#[command(name = "chamba")]
#[command(about = "Migrations, seed ledger and role bootstrap for Chambalabamba")]
struct Cli {
    /// SurrealDB endpoint (`ws://host:port`, or `mem://` for a throwaway store)
    #[arg(long, env = "CHAMBA_DB_URL", default_value = "ws://127.0.0.1:8000")]
    db_url: String,

    #[arg(long, env = "CHAMBA_DB_NS", default_value = "chambalabamba")]
    db_ns: String,

    #[arg(long, env = "CHAMBA_DB_NAME", default_value = "site")]
    db_name: String,

    /// Root user; leave empty to skip sign-in
    #[arg(long, env = "CHAMBA_DB_USER", default_value = "root")]
    db_user: String,

    #[arg(long, env = "CHAMBA_DB_PASS", default_value = "root", hide_env_values = true)]
    db_pass: String,

    /// Seed manifest (TOML). A missing file means no seeds.
    #[arg(long, env = "CHAMBA_SEED_MANIFEST", default_value = "seeds.toml")]
    manifest: PathBuf,

    /// Media root seed images are copied into
    #[arg(long, env = "CHAMBA_MEDIA_ROOT")]
    media_root: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Command {
    /// Run migrations, role bootstrap, every manifest seed and seed media
    Migrate,
    /// Apply one manifest seed by tag
    Seed {
        tag: String,
        /// Remove the tag from the ledger first so the seed runs again
        #[arg(long)]
        forget: bool,
    },
    /// Inspect or edit the seed ledger
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
    /// Copy seed media regardless of the ledger
    Media {
        /// Overwrite files that already exist
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum LedgerCommand {
    /// List applied tags
    List,
    /// Remove a tag
    Forget { tag: String },
}

impl Cli {
    fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_ns.clone(),
            database: self.db_name.clone(),
            username: self.db_user.clone(),
            password: self.db_pass.clone(),
        }
    }
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("chamba=info".parse()?);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
    Ok(())
}

async fn connect(config: &DbConfig) -> anyhow::Result<DbManager> {
    DbManager::connect(config)
        .await
        .context("connecting to SurrealDB")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let manifest = SeedManifest::load(&cli.manifest)?;
    let db_config = cli.db_config();

    match cli.command {
        Command::Migrate => {
            let db = connect(&db_config).await?;
            let report = startup::run(db.client(), &manifest, cli.media_root.as_deref()).await?;
            info!(?report, "Migrate finished");
        }
        Command::Seed { tag, forget } => {
            let db = connect(&db_config).await?;
            db.migrate().await.context("schema migrations failed")?;
            match startup::run_seed(db.client(), &manifest, &tag, forget).await? {
                SeedOutcome::Applied { records } => println!("{tag}: applied {records} record(s)"),
                SeedOutcome::AlreadyApplied => println!("{tag}: already applied"),
                SeedOutcome::SourceMissing { source } => {
                    println!("{tag}: source {} missing, not applied", source.display())
                }
            }
        }
        Command::Ledger { command } => {
            let ledger = connect(&db_config).await?.ledger();
            match command {
                LedgerCommand::List => {
                    for record in ledger.list().await? {
                        println!("{}\t{}", record.applied_at.to_rfc3339(), record.tag);
                    }
                }
                LedgerCommand::Forget { tag } => {
                    if ledger.forget(&tag).await? {
                        println!("{tag}: forgotten");
                    } else {
                        println!("{tag}: not in ledger");
                    }
                }
            }
        }
        Command::Media { force } => {
            let Some(media_config) = &manifest.media else {
                bail!("manifest {} has no [media] section", cli.manifest.display());
            };
            let Some(root) = startup::resolve_media_root(&manifest, cli.media_root.as_deref())
            else {
                bail!("no media root: pass --media-root or set CHAMBA_MEDIA_ROOT");
            };
            let copied =
                media::copy_seed_media(&manifest.base_dir, &root, &media_config.pairs, force)
                    .with_context(|| format!("copying seed media into {}", root.display()))?;
            println!("{copied} file(s) copied");
        }
    }

    Ok(())
}
