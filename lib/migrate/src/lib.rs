//! Schema migrations for postgres databases

#![warn(missing_docs)]

use sqlx::{Connection, PgConnection, Row};
use std::{collections::BTreeSet, error::Error, fmt::Display};
use tracing::{debug, info};

/// The table we record applied migrations in
const MIGRATION_TABLE: &str = "chroma_migrations";

/// One step in a database migration
#[async_trait::async_trait]
pub trait Migration: Send + Sync {
	/// This migration's name.
	/// Names are recorded in the database, so they must never change.
	fn name(&self) -> &str;

	/// Apply this migration.
	/// This is run inside a transaction.
	async fn up(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error>;
}

/// An error we encounter while migrating
#[derive(Debug)]
pub enum MigrationError {
	/// An sql query resulted in an error
	DbError(sqlx::Error),

	/// This database has a migration we don't know about.
	/// It was probably migrated by a newer version.
	UnknownMigration(String),

	/// This database has `applied`, but not `missing`,
	/// which comes before it.
	OutOfOrder {
		/// The earlier migration, which has not been applied
		missing: String,

		/// The later migration, which has
		applied: String,
	},
}

impl Display for MigrationError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::DbError(_) => write!(f, "sql error while migrating"),
			Self::UnknownMigration(name) => write!(f, "database has unknown migration `{name}`"),
			Self::OutOfOrder { missing, applied } => write!(
				f,
				"database has migration `{applied}` but is missing earlier migration `{missing}`"
			),
		}
	}
}

impl Error for MigrationError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::DbError(e) => Some(e),
			_ => None,
		}
	}
}

impl From<sqlx::Error> for MigrationError {
	fn from(value: sqlx::Error) -> Self {
		Self::DbError(value)
	}
}

/// Match the migrations a database has against the ones we expect.
///
/// Returns one flag per expected migration, `true` if it is applied.
/// Applied migrations must be a prefix of `expected`.
fn match_applied(
	expected: &[&str],
	mut applied: BTreeSet<String>,
) -> Result<Vec<bool>, MigrationError> {
	let mut flags = Vec::with_capacity(expected.len());
	let mut first_missing: Option<&str> = None;

	for name in expected {
		let is_applied = applied.remove(*name);

		match (is_applied, first_missing) {
			(true, Some(missing)) => {
				return Err(MigrationError::OutOfOrder {
					missing: missing.into(),
					applied: (*name).into(),
				})
			}
			(false, None) => first_missing = Some(*name),
			_ => {}
		}

		flags.push(is_applied);
	}

	if let Some(name) = applied.into_iter().next() {
		return Err(MigrationError::UnknownMigration(name));
	}

	return Ok(flags);
}

/// Applies a list of migrations to a database
pub struct Migrator<'a> {
	/// Every migration, in the order they're run,
	/// paired with a flag that is `true` once it has been applied.
	migrations: Vec<(&'a dyn Migration, bool)>,

	/// A connection to the database we're migrating
	conn: &'a mut PgConnection,

	/// The name of the database we're migrating, used only for logs
	name_of_db: String,
}

impl<'a> Migrator<'a> {
	/// Prepare to migrate the given database with the given steps.
	///
	/// Fails if this database's migrations don't match `migrations`.
	pub async fn new(
		conn: &'a mut PgConnection,
		name_of_db: &str,
		migrations: &'a [&'a dyn Migration],
	) -> Result<Self, MigrationError> {
		sqlx::query(&format!(
			"
			CREATE TABLE IF NOT EXISTS {MIGRATION_TABLE} (
				name TEXT PRIMARY KEY NOT NULL,
				applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
			);
			"
		))
		.execute(&mut *conn)
		.await?;

		let applied = sqlx::query(&format!("SELECT name FROM {MIGRATION_TABLE};"))
			.fetch_all(&mut *conn)
			.await?
			.into_iter()
			.map(|row| row.try_get::<String, _>("name"))
			.collect::<Result<BTreeSet<_>, _>>()?;

		let names: Vec<&str> = migrations.iter().map(|m| m.name()).collect();
		let flags = match_applied(&names, applied)?;

		return Ok(Self {
			migrations: migrations.iter().copied().zip(flags).collect(),
			conn,
			name_of_db: name_of_db.into(),
		});
	}

	/// Have all our migrations been applied?
	pub fn is_up(&self) -> bool {
		return self.migrations.iter().all(|(_, applied)| *applied);
	}

	/// Apply every migration that has not been run on this database.
	/// Each migration is applied and recorded in one transaction.
	pub async fn up(&mut self) -> Result<(), MigrationError> {
		for (migration, applied) in &mut self.migrations {
			if *applied {
				debug!(
					message = "Skipping migration, already applied",
					migration = migration.name(),
					database = self.name_of_db
				);
				continue;
			}

			info!(
				message = "Applying migration",
				migration = migration.name(),
				database = self.name_of_db
			);

			let mut t = self.conn.begin().await?;
			migration.up(&mut *t).await?;

			sqlx::query(&format!("INSERT INTO {MIGRATION_TABLE} (name) VALUES ($1);"))
				.bind(migration.name())
				.execute(&mut *t)
				.await?;

			t.commit().await?;
			*applied = true;
		}

		return Ok(());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn set(names: &[&str]) -> BTreeSet<String> {
		names.iter().map(|x| String::from(*x)).collect()
	}

	#[test]
	fn fresh_database() {
		let flags = match_applied(&["a", "b"], set(&[])).unwrap();
		assert_eq!(flags, vec![false, false]);
	}

	#[test]
	fn partly_migrated() {
		let flags = match_applied(&["a", "b", "c"], set(&["a", "b"])).unwrap();
		assert_eq!(flags, vec![true, true, false]);
	}

	#[test]
	fn gaps_are_rejected() {
		let err = match_applied(&["a", "b", "c"], set(&["a", "c"])).unwrap_err();
		assert!(matches!(
			err,
			MigrationError::OutOfOrder { ref missing, ref applied }
				if missing == "b" && applied == "c"
		));
	}

	#[test]
	fn unknown_migrations_are_rejected() {
		let err = match_applied(&["a"], set(&["a", "z"])).unwrap_err();
		assert!(matches!(err, MigrationError::UnknownMigration(ref x) if x == "z"));
	}
}
