//! tickets-migrate: manage the tickets database schema.
//!
//! Usage:
//!   tickets-migrate up
//!   tickets-migrate down --steps 1
//!   tickets-migrate status
//!   tickets-migrate create --name add_seat_numbers

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::migrate::Migrate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use tickets_server::config::Config;
use tickets_server::logging;
use tickets_server::MIGRATOR;

#[derive(Parser)]
#[command(name = "tickets-migrate", about = "Manage the tickets database schema")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply all pending migrations.
    Up,
    /// Revert the most recently applied migrations.
    Down {
        #[arg(long, default_value_t = 1)]
        steps: usize,
    },
    /// Show every known migration and whether it is applied.
    Status,
    /// Write an empty up/down migration pair.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let config = Config::from_env()?;
    tracing::dispatcher::set_global_default(logging::build_dispatch(&config.logging)?)?;

    match args.command {
        Command::Up => {
            let pool = connect(&config).await?;
            MIGRATOR.run(&pool).await?;
            tracing::info!("All migrations applied successfully");
        }
        Command::Down { steps } => {
            let pool = connect(&config).await?;
            let reverted = migrate_down(&pool, steps).await?;
            tracing::info!("Rolled back {} migration(s)", reverted);
        }
        Command::Status => {
            let pool = connect(&config).await?;
            print_status(&pool).await?;
        }
        Command::Create { name, dir } => {
            let (up, down) = create_migration(&dir, &name, Utc::now())?;
            tracing::info!("Created migration {} and {}", up.display(), down.display());
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(config.database.acquire_timeout)
        .connect(&config.database.url)
        .await
        .context("failed to connect to database")
}

async fn applied_versions(pool: &PgPool) -> Result<Vec<i64>> {
    let mut conn = pool.acquire().await?;
    conn.ensure_migrations_table().await?;
    let mut versions: Vec<i64> = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|m| m.version)
        .collect();
    versions.sort_unstable();
    Ok(versions)
}

/// Reverts the newest `steps` applied migrations and returns how many ran.
async fn migrate_down(pool: &PgPool, steps: usize) -> Result<usize> {
    let applied = applied_versions(pool).await?;
    let steps = steps.min(applied.len());
    if steps == 0 {
        return Ok(0);
    }

    // undo() reverts everything strictly above the target version.
    let target = applied
        .len()
        .checked_sub(steps + 1)
        .map(|i| applied[i])
        .unwrap_or(0);
    MIGRATOR.undo(pool, target).await?;
    Ok(steps)
}

async fn print_status(pool: &PgPool) -> Result<()> {
    applied_versions(pool).await?;
    let installed: Vec<(i64, DateTime<Utc>)> =
        sqlx::query_as("SELECT version, installed_on FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await?;

    println!(
        "{:<16} {:<30} {:<8} {:<20}",
        "Version", "Name", "Applied", "Installed At"
    );
    println!("{}", "-".repeat(76));
    for migration in MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
    {
        let installed_on = installed
            .iter()
            .find(|(version, _)| *version == migration.version)
            .map(|(_, at)| at.format("%Y-%m-%d %H:%M:%S").to_string());
        println!(
            "{:<16} {:<30} {:<8} {:<20}",
            migration.version,
            migration.description,
            if installed_on.is_some() { "Yes" } else { "No" },
            installed_on.unwrap_or_default()
        );
    }
    Ok(())
}

fn migration_slug(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn create_migration(dir: &Path, name: &str, now: DateTime<Utc>) -> Result<(PathBuf, PathBuf)> {
    let slug = migration_slug(name);
    if slug.trim_matches('_').is_empty() {
        bail!("migration name must contain at least one letter or digit");
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let version = now.format("%Y%m%d%H%M%S").to_string();
    let up = dir.join(format!("{version}_{slug}.up.sql"));
    let down = dir.join(format!("{version}_{slug}.down.sql"));
    if up.exists() || down.exists() {
        bail!("migration {version}_{slug} already exists");
    }

    std::fs::write(&up, format!("-- Migration: {slug}\n-- Version: {version}\n\n"))?;
    std::fs::write(&down, format!("-- Rollback: {slug}\n-- Version: {version}\n\n"))?;
    Ok((up, down))
}
