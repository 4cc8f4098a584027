//! Database migrations infrastructure

use sqlx::sqlite::SqlitePool;
use tracing::info;

use crate::domain::DomainError;

/// A forward-only schema migration
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

/// Schema migrations in application order
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "registration responses, teams, verified identities",
    statements: &[
        r#"
        CREATE TABLE IF NOT EXISTS registration_responses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            role TEXT NOT NULL,
            email TEXT NOT NULL,
            handle TEXT NOT NULL,
            received_at TEXT NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_registration_claim ON registration_responses (role, email, handle)",
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            role_token TEXT,
            category_channel_ref TEXT,
            text_channel_ref TEXT,
            voice_channel_ref TEXT,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS verified_identities (
            user_id INTEGER PRIMARY KEY,
            role TEXT NOT NULL,
            email TEXT NOT NULL,
            team_id INTEGER REFERENCES teams (id),
            verified_at TEXT NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_identity_email ON verified_identities (email)",
        "CREATE INDEX IF NOT EXISTS idx_identity_team ON verified_identities (team_id)",
    ],
}];

/// SQLite migrator tracking applied versions in `_migrations`
#[derive(Debug)]
pub struct SqliteMigrator {
    pool: SqlitePool,
}

impl SqliteMigrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    /// Runs a single migration inside a transaction, skipping it if already applied
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        let applied: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM _migrations WHERE version = ?")
                .bind(migration.version)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to check migration status: {}", e))
                })?;

        if applied > 0 {
            return Ok(false);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin migration: {}", e)))?;

        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;
        }

        sqlx::query("INSERT INTO _migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit migration: {}", e)))?;

        info!(version = migration.version, description = migration.description, "Applied migration");
        Ok(true)
    }

    /// Runs all pending migrations, returning how many were applied
    pub async fn run(&self) -> Result<usize, DomainError> {
        let mut applied = 0;

        for migration in MIGRATIONS {
            if self.run_migration(migration).await? {
                applied += 1;
            }
        }

        Ok(applied)
    }

    /// Highest applied migration version
    pub async fn version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read migration version: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_versions_are_increasing() {
        let versions: Vec<i64> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }
}
