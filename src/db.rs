//! SQLite connection pool and schema migrations.

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::exception::Result;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

fn is_in_memory(url: &str) -> bool {
	url.contains(":memory:") || url.contains("mode=memory")
}

/// Open a pool for `url`, creating the database file when missing
///
/// An in-memory database lives as long as its connection, so such pools are
/// pinned to a single connection that never expires.
pub async fn create_pool(url: &str, max_connections: u32) -> Result<SqlitePool> {
	let mut options = SqliteConnectOptions::from_str(url)?
		.create_if_missing(true)
		.foreign_keys(true)
		.busy_timeout(Duration::from_secs(5));

	let pool = if is_in_memory(url) {
		SqlitePoolOptions::new()
			.max_connections(1)
			.min_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
			.connect_with(options)
			.await?
	} else {
		options = options.journal_mode(SqliteJournalMode::Wal);
		SqlitePoolOptions::new()
			.max_connections(max_connections.max(1))
			.connect_with(options)
			.await?
	};

	tracing::debug!(url, "Database pool ready");
	Ok(pool)
}

/// Apply every pending migration
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	MIGRATOR.run(pool).await?;
	tracing::info!("Migrations applied");
	Ok(())
}

/// Migrations known to the binary, with whether each is applied
pub async fn migration_status(pool: &SqlitePool) -> Result<Vec<(i64, String, bool)>> {
	let ledger_tables: i64 = sqlx::query_scalar(
		"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
	)
	.fetch_one(pool)
	.await?;
	let applied: Vec<i64> = if ledger_tables > 0 {
		sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
			.fetch_all(pool)
			.await?
	} else {
		Vec::new()
	};

	Ok(MIGRATOR
		.iter()
		.map(|m| {
			(
				m.version,
				m.description.to_string(),
				applied.contains(&m.version),
			)
		})
		.collect())
}
