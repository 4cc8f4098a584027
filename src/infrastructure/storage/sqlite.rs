//! SQLite record store with connection pooling

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;

use super::migrations::SqliteMigrator;
use crate::domain::identity::{ExternalUserId, IdentityRepository, VerifiedIdentity};
use crate::domain::registration::{RegistrationRepository, RegistrationResponse};
use crate::domain::team::{ChannelBundle, Team, TeamId, TeamRepository};
use crate::domain::{DomainError, Role};

/// SQLite storage configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file path
    pub path: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout_secs: u64,
    /// How long a writer waits on a locked database, in seconds
    pub busy_timeout_secs: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "records.db".to_string(),
            max_connections: 5,
            connect_timeout_secs: 30,
            busy_timeout_secs: 5,
        }
    }
}

impl SqliteConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }
}

/// SQLite implementation of all three record repositories.
///
/// Every lookup by key is served by an index; membership changes are single
/// conditional `UPDATE`s so a row can never be claimed by two teams.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database file
    pub async fn connect(config: &SqliteConfig) -> Result<Self, DomainError> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to open database '{}': {}", config.path, e))
            })?;

        Ok(Self::new(pool))
    }

    /// Applies pending schema migrations
    pub async fn migrate(&self) -> Result<usize, DomainError> {
        SqliteMigrator::new(self.pool.clone()).run().await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn storage_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::storage(format!("{}: {}", context, e))
}

fn write_error(context: &'static str, conflict: String) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => DomainError::conflict(conflict),
        _ => DomainError::storage(format!("{}: {}", context, e)),
    }
}

// Snowflakes fit in 63 bits; the cast is a lossless bit reinterpretation either way.
fn user_id_column(id: ExternalUserId) -> i64 {
    id.value() as i64
}

fn decode_role(value: &str) -> Result<Role, DomainError> {
    value
        .parse()
        .map_err(|_| DomainError::storage(format!("Corrupt role column '{}'", value)))
}

fn decode_identity(row: &SqliteRow) -> Result<VerifiedIdentity, DomainError> {
    let decode = storage_error("Failed to decode identity");
    let (user_id, role, email, team_id, verified_at) = (|| {
        Ok::<_, sqlx::Error>((
            row.try_get::<i64, _>("user_id")?,
            row.try_get::<String, _>("role")?,
            row.try_get::<String, _>("email")?,
            row.try_get::<Option<i64>, _>("team_id")?,
            row.try_get::<DateTime<Utc>, _>("verified_at")?,
        ))
    })()
    .map_err(decode)?;

    Ok(VerifiedIdentity::restore(
        ExternalUserId::new(user_id as u64),
        decode_role(&role)?,
        email,
        team_id.map(TeamId::new),
        verified_at,
    ))
}

fn decode_team(row: &SqliteRow) -> Result<Team, DomainError> {
    let decode = || -> Result<Team, sqlx::Error> {
        let role_token: Option<String> = row.try_get("role_token")?;
        let category: Option<String> = row.try_get("category_channel_ref")?;
        let text: Option<String> = row.try_get("text_channel_ref")?;
        let voice: Option<String> = row.try_get("voice_channel_ref")?;

        let channels = match (role_token, category, text) {
            (Some(role_token), Some(category), Some(text)) => Some(ChannelBundle {
                role_token,
                category_channel_ref: category,
                text_channel_ref: text,
                voice_channel_ref: voice,
            }),
            _ => None,
        };

        Ok(Team::restore(
            TeamId::new(row.try_get("id")?),
            row.try_get::<String, _>("name")?,
            channels,
            row.try_get("created_at")?,
        ))
    };

    decode().map_err(storage_error("Failed to decode team"))
}

const IDENTITY_COLUMNS: &str = "user_id, role, email, team_id, verified_at";
const TEAM_COLUMNS: &str =
    "id, name, role_token, category_channel_ref, text_channel_ref, voice_channel_ref, created_at";

#[async_trait]
impl RegistrationRepository for SqliteStorage {
    async fn append(
        &self,
        response: RegistrationResponse,
    ) -> Result<RegistrationResponse, DomainError> {
        sqlx::query(
            "INSERT INTO registration_responses (role, email, handle, received_at) VALUES (?, ?, ?, ?)",
        )
        .bind(response.role().as_str())
        .bind(response.email())
        .bind(response.handle())
        .bind(response.received_at())
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to append registration"))?;

        Ok(response)
    }

    async fn exists_matching(
        &self,
        role: Role,
        email: &str,
        handle: &str,
    ) -> Result<bool, DomainError> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM registration_responses WHERE role = ? AND email = ? AND handle = ?)",
        )
        .bind(role.as_str())
        .bind(email)
        .bind(handle)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error("Failed to look up registration"))?;

        Ok(found != 0)
    }

    async fn count(&self, role: Option<Role>) -> Result<usize, DomainError> {
        let count: i64 = match role {
            Some(role) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM registration_responses WHERE role = ?")
                    .bind(role.as_str())
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM registration_responses")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(storage_error("Failed to count registrations"))?;

        Ok(count as usize)
    }
}

#[async_trait]
impl IdentityRepository for SqliteStorage {
    async fn get(&self, user_id: ExternalUserId) -> Result<Option<VerifiedIdentity>, DomainError> {
        let query = format!("SELECT {} FROM verified_identities WHERE user_id = ?", IDENTITY_COLUMNS);

        sqlx::query(&query)
            .bind(user_id_column(user_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to get identity"))?
            .as_ref()
            .map(decode_identity)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<VerifiedIdentity>, DomainError> {
        let query = format!(
            "SELECT {} FROM verified_identities WHERE email = ? ORDER BY verified_at, user_id LIMIT 1",
            IDENTITY_COLUMNS
        );

        sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to find identity by email"))?
            .as_ref()
            .map(decode_identity)
            .transpose()
    }

    async fn create(&self, identity: VerifiedIdentity) -> Result<VerifiedIdentity, DomainError> {
        sqlx::query(
            "INSERT INTO verified_identities (user_id, role, email, team_id, verified_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id_column(identity.user_id()))
        .bind(identity.role().as_str())
        .bind(identity.email())
        .bind(identity.team_id().map(|id| id.value()))
        .bind(identity.verified_at())
        .execute(&self.pool)
        .await
        .map_err(write_error(
            "Failed to create identity",
            format!("Account {} is already verified", identity.user_id()),
        ))?;

        Ok(identity)
    }

    async fn assign_team(
        &self,
        user_id: ExternalUserId,
        expected: Option<TeamId>,
        new: Option<TeamId>,
    ) -> Result<bool, DomainError> {
        // `IS` compares NULL as a value, so one statement covers both cases
        let result =
            sqlx::query("UPDATE verified_identities SET team_id = ? WHERE user_id = ? AND team_id IS ?")
                .bind(new.map(|id| id.value()))
                .bind(user_id_column(user_id))
                .bind(expected.map(|id| id.value()))
                .execute(&self.pool)
                .await
                .map_err(storage_error("Failed to update team membership"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_members(&self, team_id: TeamId) -> Result<Vec<VerifiedIdentity>, DomainError> {
        let query = format!(
            "SELECT {} FROM verified_identities WHERE team_id = ? ORDER BY verified_at, user_id",
            IDENTITY_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(team_id.value())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("Failed to list team members"))?;

        rows.iter().map(decode_identity).collect()
    }

    async fn count_members(&self, team_id: TeamId) -> Result<usize, DomainError> {
        let count: i64 =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM verified_identities WHERE team_id = ?")
                .bind(team_id.value())
                .fetch_one(&self.pool)
                .await
                .map_err(storage_error("Failed to count team members"))?;

        Ok(count as usize)
    }

    async fn list(&self) -> Result<Vec<VerifiedIdentity>, DomainError> {
        let query = format!(
            "SELECT {} FROM verified_identities ORDER BY verified_at, user_id",
            IDENTITY_COLUMNS
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("Failed to list identities"))?;

        rows.iter().map(decode_identity).collect()
    }
}

#[async_trait]
impl TeamRepository for SqliteStorage {
    async fn create(&self, name: &str) -> Result<Team, DomainError> {
        let created_at = Utc::now();

        let result = sqlx::query("INSERT INTO teams (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(write_error(
                "Failed to create team",
                format!("Team name '{}' is already taken", name),
            ))?;

        Ok(Team::restore(
            TeamId::new(result.last_insert_rowid()),
            name,
            None,
            created_at,
        ))
    }

    async fn get(&self, id: TeamId) -> Result<Option<Team>, DomainError> {
        let query = format!("SELECT {} FROM teams WHERE id = ?", TEAM_COLUMNS);

        sqlx::query(&query)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to get team"))?
            .as_ref()
            .map(decode_team)
            .transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Team>, DomainError> {
        let query = format!("SELECT {} FROM teams WHERE name = ?", TEAM_COLUMNS);

        sqlx::query(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to find team by name"))?
            .as_ref()
            .map(decode_team)
            .transpose()
    }

    async fn rename(&self, id: TeamId, name: &str) -> Result<Team, DomainError> {
        let result = sqlx::query("UPDATE teams SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(write_error(
                "Failed to rename team",
                format!("Team name '{}' is already taken", name),
            ))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("Team '{}' not found", id)));
        }

        TeamRepository::get(self, id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Team '{}' not found", id)))
    }

    async fn attach_channels(
        &self,
        id: TeamId,
        channels: ChannelBundle,
    ) -> Result<Team, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE teams
            SET role_token = ?, category_channel_ref = ?, text_channel_ref = ?, voice_channel_ref = ?
            WHERE id = ?
            "#,
        )
        .bind(&channels.role_token)
        .bind(&channels.category_channel_ref)
        .bind(&channels.text_channel_ref)
        .bind(&channels.voice_channel_ref)
        .bind(id.value())
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to attach team channels"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("Team '{}' not found", id)));
        }

        TeamRepository::get(self, id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Team '{}' not found", id)))
    }

    async fn delete(&self, id: TeamId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(storage_error("Failed to delete team"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Team>, DomainError> {
        let query = format!("SELECT {} FROM teams ORDER BY id", TEAM_COLUMNS);

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("Failed to list teams"))?;

        rows.iter().map(decode_team).collect()
    }

    async fn existing_ids(&self) -> Result<Vec<TeamId>, DomainError> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM teams ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("Failed to list team ids"))?;

        Ok(ids.into_iter().map(TeamId::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_config_default() {
        let config = SqliteConfig::default();

        assert_eq!(config.path, "records.db");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.connect_timeout_secs, 30);
    }

    #[test]
    fn test_sqlite_config_builder() {
        let config = SqliteConfig::new("/tmp/test.db")
            .with_max_connections(2)
            .with_connect_timeout(5);

        assert_eq!(config.path, "/tmp/test.db");
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.connect_timeout_secs, 5);
    }

    #[test]
    fn test_user_id_column_round_trips_high_bits() {
        let id = ExternalUserId::new(u64::MAX - 1);
        assert_eq!(ExternalUserId::new(user_id_column(id) as u64), id);
    }

    async fn open() -> (tempfile::TempDir, SqliteStorage) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let storage = SqliteStorage::connect(&SqliteConfig::new(path.to_string_lossy()))
            .await
            .unwrap();
        storage.migrate().await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let (_dir, storage) = open().await;

        assert_eq!(storage.migrate().await.unwrap(), 0);
        let version = SqliteMigrator::new(storage.pool().clone()).version().await.unwrap();
        assert_eq!(version, Some(1));
    }

    #[tokio::test]
    async fn test_registration_lookup() {
        let (_dir, storage) = open().await;
        let response = RegistrationResponse::new(Role::Mentor, "M@x.com", "mentor#9").unwrap();
        storage.append(response).await.unwrap();

        assert!(storage
            .exists_matching(Role::Mentor, "m@x.com", "mentor#9")
            .await
            .unwrap());
        assert!(!storage
            .exists_matching(Role::Participant, "m@x.com", "mentor#9")
            .await
            .unwrap());
        assert_eq!(RegistrationRepository::count(&storage, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_identity_and_membership() {
        let (_dir, storage) = open().await;
        let user = ExternalUserId::new(900_000_000_000_000_001);
        IdentityRepository::create(
            &storage,
            VerifiedIdentity::new(user, Role::Participant, "a@x.com"),
        )
        .await
        .unwrap();

        let duplicate = IdentityRepository::create(
            &storage,
            VerifiedIdentity::new(user, Role::Mentor, "a@x.com"),
        )
        .await;
        assert!(matches!(duplicate, Err(DomainError::Conflict { .. })));

        let team = TeamRepository::create(&storage, "Rockets").await.unwrap();
        assert!(storage.assign_team(user, None, Some(team.id())).await.unwrap());
        assert!(!storage.assign_team(user, None, Some(team.id())).await.unwrap());
        assert_eq!(storage.count_members(team.id()).await.unwrap(), 1);

        let identity = IdentityRepository::get(&storage, user).await.unwrap().unwrap();
        assert_eq!(identity.team_id(), Some(team.id()));
        assert_eq!(identity.user_id(), user);
    }

    #[tokio::test]
    async fn test_team_name_conflict_and_rename() {
        let (_dir, storage) = open().await;
        let a = TeamRepository::create(&storage, "AB").await.unwrap();

        let duplicate = TeamRepository::create(&storage, "AB").await;
        assert!(matches!(duplicate, Err(DomainError::Conflict { .. })));

        let renamed = storage.rename(a.id(), "CD").await.unwrap();
        assert_eq!(renamed.name(), "CD");
        assert!(TeamRepository::create(&storage, "AB").await.is_ok());
    }

    #[tokio::test]
    async fn test_team_ids_not_reused() {
        let (_dir, storage) = open().await;
        let first = TeamRepository::create(&storage, "One").await.unwrap();
        assert!(TeamRepository::delete(&storage, first.id()).await.unwrap());

        let second = TeamRepository::create(&storage, "Two").await.unwrap();
        assert!(second.id() > first.id());
        assert_eq!(storage.existing_ids().await.unwrap(), vec![second.id()]);
    }

    #[tokio::test]
    async fn test_attach_channels() {
        let (_dir, storage) = open().await;
        let team = TeamRepository::create(&storage, "Rockets").await.unwrap();

        let bundle = ChannelBundle::new("role-1", "cat-1", "text-1");
        storage.attach_channels(team.id(), bundle.clone()).await.unwrap();

        let fetched = TeamRepository::get(&storage, team.id()).await.unwrap().unwrap();
        assert_eq!(fetched.channels(), Some(&bundle));
    }
}
