//! In-memory record store implementations

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::identity::{ExternalUserId, IdentityRepository, VerifiedIdentity};
use crate::domain::registration::{RegistrationRepository, RegistrationResponse};
use crate::domain::team::{ChannelBundle, Team, TeamId, TeamRepository};
use crate::domain::{DomainError, Role};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, DomainError> {
    lock.read()
        .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, DomainError> {
    lock.write()
        .map_err(|e| DomainError::storage(format!("Failed to acquire write lock: {}", e)))
}

#[derive(Debug, Default)]
struct RegistrationLog {
    responses: Vec<RegistrationResponse>,
    index: HashSet<(Role, String, String)>,
}

/// Thread-safe in-memory registration log
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug, Default)]
pub struct InMemoryRegistrationRepository {
    log: RwLock<RegistrationLog>,
}

impl InMemoryRegistrationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryRegistrationRepository {
    async fn append(
        &self,
        response: RegistrationResponse,
    ) -> Result<RegistrationResponse, DomainError> {
        let mut log = write(&self.log)?;
        log.index.insert((
            response.role(),
            response.email().to_string(),
            response.handle().to_string(),
        ));
        log.responses.push(response.clone());
        Ok(response)
    }

    async fn exists_matching(
        &self,
        role: Role,
        email: &str,
        handle: &str,
    ) -> Result<bool, DomainError> {
        let log = read(&self.log)?;
        Ok(log
            .index
            .contains(&(role, email.to_string(), handle.to_string())))
    }

    async fn count(&self, role: Option<Role>) -> Result<usize, DomainError> {
        let log = read(&self.log)?;
        Ok(log
            .responses
            .iter()
            .filter(|r| role.is_none_or(|role| r.role() == role))
            .count())
    }
}

#[derive(Debug, Default)]
struct IdentityTable {
    rows: HashMap<ExternalUserId, VerifiedIdentity>,
    by_team: HashMap<TeamId, BTreeSet<ExternalUserId>>,
}

impl IdentityTable {
    fn sorted(&self, identities: impl Iterator<Item = VerifiedIdentity>) -> Vec<VerifiedIdentity> {
        let mut result: Vec<VerifiedIdentity> = identities.collect();
        result.sort_by_key(|i| (i.verified_at(), i.user_id()));
        result
    }
}

/// Thread-safe in-memory identity table with a team membership index
#[derive(Debug, Default)]
pub struct InMemoryIdentityRepository {
    table: RwLock<IdentityTable>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn get(&self, user_id: ExternalUserId) -> Result<Option<VerifiedIdentity>, DomainError> {
        Ok(read(&self.table)?.rows.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<VerifiedIdentity>, DomainError> {
        let table = read(&self.table)?;
        let matches = table
            .rows
            .values()
            .filter(|i| i.email() == email)
            .cloned();
        Ok(table.sorted(matches).into_iter().next())
    }

    async fn create(&self, identity: VerifiedIdentity) -> Result<VerifiedIdentity, DomainError> {
        let mut table = write(&self.table)?;

        if table.rows.contains_key(&identity.user_id()) {
            return Err(DomainError::conflict(format!(
                "Account {} is already verified",
                identity.user_id()
            )));
        }

        if let Some(team_id) = identity.team_id() {
            table
                .by_team
                .entry(team_id)
                .or_default()
                .insert(identity.user_id());
        }

        table.rows.insert(identity.user_id(), identity.clone());
        Ok(identity)
    }

    async fn assign_team(
        &self,
        user_id: ExternalUserId,
        expected: Option<TeamId>,
        new: Option<TeamId>,
    ) -> Result<bool, DomainError> {
        let mut table = write(&self.table)?;

        let Some(identity) = table.rows.get_mut(&user_id) else {
            return Ok(false);
        };

        if identity.team_id() != expected {
            return Ok(false);
        }

        identity.set_team_id(new);

        if let Some(old) = expected {
            if let Some(members) = table.by_team.get_mut(&old) {
                members.remove(&user_id);
                if members.is_empty() {
                    table.by_team.remove(&old);
                }
            }
        }

        if let Some(new) = new {
            table.by_team.entry(new).or_default().insert(user_id);
        }

        Ok(true)
    }

    async fn list_members(&self, team_id: TeamId) -> Result<Vec<VerifiedIdentity>, DomainError> {
        let table = read(&self.table)?;
        let members = table
            .by_team
            .get(&team_id)
            .into_iter()
            .flatten()
            .filter_map(|id| table.rows.get(id).cloned());
        Ok(table.sorted(members))
    }

    async fn count_members(&self, team_id: TeamId) -> Result<usize, DomainError> {
        let table = read(&self.table)?;
        Ok(table.by_team.get(&team_id).map_or(0, BTreeSet::len))
    }

    async fn list(&self) -> Result<Vec<VerifiedIdentity>, DomainError> {
        let table = read(&self.table)?;
        Ok(table.sorted(table.rows.values().cloned()))
    }
}

#[derive(Debug, Default)]
struct TeamTable {
    rows: BTreeMap<TeamId, Team>,
    names: HashMap<String, TeamId>,
    last_id: i64,
}

/// Thread-safe in-memory team table.
///
/// Ids are never reused, matching SQLite `AUTOINCREMENT`.
#[derive(Debug, Default)]
pub struct InMemoryTeamRepository {
    table: RwLock<TeamTable>,
}

impl InMemoryTeamRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TeamRepository for InMemoryTeamRepository {
    async fn create(&self, name: &str) -> Result<Team, DomainError> {
        let mut table = write(&self.table)?;

        if table.names.contains_key(name) {
            return Err(DomainError::conflict(format!(
                "Team name '{}' is already taken",
                name
            )));
        }

        table.last_id += 1;
        let team = Team::restore(TeamId::new(table.last_id), name, None, Utc::now());
        table.names.insert(name.to_string(), team.id());
        table.rows.insert(team.id(), team.clone());
        Ok(team)
    }

    async fn get(&self, id: TeamId) -> Result<Option<Team>, DomainError> {
        Ok(read(&self.table)?.rows.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Team>, DomainError> {
        let table = read(&self.table)?;
        Ok(table
            .names
            .get(name)
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    async fn rename(&self, id: TeamId, name: &str) -> Result<Team, DomainError> {
        let mut table = write(&self.table)?;

        match table.names.get(name) {
            Some(owner) if *owner == id => {}
            Some(_) => {
                return Err(DomainError::conflict(format!(
                    "Team name '{}' is already taken",
                    name
                )));
            }
            None => {}
        }

        let team = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("Team '{}' not found", id)))?;
        let old_name = team.name().to_string();
        team.set_name(name);
        let team = team.clone();

        table.names.remove(&old_name);
        table.names.insert(name.to_string(), id);
        Ok(team)
    }

    async fn attach_channels(
        &self,
        id: TeamId,
        channels: ChannelBundle,
    ) -> Result<Team, DomainError> {
        let mut table = write(&self.table)?;
        let team = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("Team '{}' not found", id)))?;
        team.set_channels(channels);
        Ok(team.clone())
    }

    async fn delete(&self, id: TeamId) -> Result<bool, DomainError> {
        let mut table = write(&self.table)?;

        match table.rows.remove(&id) {
            Some(team) => {
                table.names.remove(team.name());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<Team>, DomainError> {
        Ok(read(&self.table)?.rows.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: u64) -> VerifiedIdentity {
        VerifiedIdentity::new(ExternalUserId::new(id), Role::Participant, format!("{}@x.com", id))
    }

    #[tokio::test]
    async fn test_registration_exact_match() {
        let repo = InMemoryRegistrationRepository::new();
        repo.append(RegistrationResponse::new(Role::Participant, "a@x.com", "alice#1").unwrap())
            .await
            .unwrap();
        repo.append(RegistrationResponse::new(Role::Participant, "a@x.com", "alice#1").unwrap())
            .await
            .unwrap();

        assert!(repo
            .exists_matching(Role::Participant, "a@x.com", "alice#1")
            .await
            .unwrap());
        assert!(!repo
            .exists_matching(Role::Participant, "a@x.com", "alice#2")
            .await
            .unwrap());
        assert_eq!(repo.count(Some(Role::Participant)).await.unwrap(), 2);
        assert_eq!(repo.count(Some(Role::Mentor)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_identity_create_duplicate() {
        let repo = InMemoryIdentityRepository::new();
        repo.create(participant(1)).await.unwrap();

        let result = repo.create(participant(1)).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_identity_find_by_email() {
        let repo = InMemoryIdentityRepository::new();
        repo.create(participant(5)).await.unwrap();

        let found = repo.find_by_email("5@x.com").await.unwrap();
        assert_eq!(found.unwrap().user_id(), ExternalUserId::new(5));
        assert!(repo.find_by_email("6@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_assign_team_compare_and_set() {
        let repo = InMemoryIdentityRepository::new();
        let user = ExternalUserId::new(1);
        let (a, b) = (TeamId::new(1), TeamId::new(2));
        repo.create(participant(1)).await.unwrap();

        assert!(repo.assign_team(user, None, Some(a)).await.unwrap());
        assert!(!repo.assign_team(user, None, Some(b)).await.unwrap());
        assert_eq!(repo.count_members(a).await.unwrap(), 1);
        assert_eq!(repo.count_members(b).await.unwrap(), 0);

        assert!(repo.assign_team(user, Some(a), None).await.unwrap());
        assert_eq!(repo.count_members(a).await.unwrap(), 0);
        assert!(repo.get(user).await.unwrap().unwrap().team_id().is_none());
    }

    #[tokio::test]
    async fn test_assign_team_unknown_identity() {
        let repo = InMemoryIdentityRepository::new();
        let assigned = repo
            .assign_team(ExternalUserId::new(77), None, Some(TeamId::new(1)))
            .await
            .unwrap();
        assert!(!assigned);
    }

    #[tokio::test]
    async fn test_list_members() {
        let repo = InMemoryIdentityRepository::new();
        let team = TeamId::new(3);

        for id in [3, 1, 2] {
            repo.create(participant(id)).await.unwrap();
            repo.assign_team(ExternalUserId::new(id), None, Some(team))
                .await
                .unwrap();
        }

        let members = repo.list_members(team).await.unwrap();
        assert_eq!(members.len(), 3);
        assert!(members.iter().all(|m| m.team_id() == Some(team)));
    }

    #[tokio::test]
    async fn test_team_ids_are_monotonic() {
        let repo = InMemoryTeamRepository::new();
        let first = repo.create("A").await.unwrap();
        repo.delete(first.id()).await.unwrap();
        let second = repo.create("A").await.unwrap();

        assert_eq!(first.id(), TeamId::new(1));
        assert_eq!(second.id(), TeamId::new(2));
    }

    #[tokio::test]
    async fn test_team_name_unique() {
        let repo = InMemoryTeamRepository::new();
        repo.create("AB").await.unwrap();

        let result = repo.create("AB").await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_team_rename() {
        let repo = InMemoryTeamRepository::new();
        let a = repo.create("A").await.unwrap();
        repo.create("B").await.unwrap();

        assert!(repo.rename(a.id(), "B").await.unwrap_err().is_conflict());

        let renamed = repo.rename(a.id(), "C").await.unwrap();
        assert_eq!(renamed.name(), "C");
        assert!(repo.find_by_name("A").await.unwrap().is_none());
        assert_eq!(repo.find_by_name("C").await.unwrap().unwrap().id(), a.id());

        // renaming to its own name is a no-op
        assert!(repo.rename(a.id(), "C").await.is_ok());
        assert!(repo
            .rename(TeamId::new(99), "Z")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_attach_channels() {
        let repo = InMemoryTeamRepository::new();
        let team = repo.create("A").await.unwrap();

        let updated = repo
            .attach_channels(team.id(), ChannelBundle::new("r", "c", "t"))
            .await
            .unwrap();
        assert_eq!(updated.channels().unwrap().text_channel_ref, "t");
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let repo = InMemoryTeamRepository::new();
        repo.create("Zed").await.unwrap();
        repo.create("Alpha").await.unwrap();

        let ids = repo.existing_ids().await.unwrap();
        assert_eq!(ids, vec![TeamId::new(1), TeamId::new(2)]);
    }
}
