//! Team service for team formation and membership

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::domain::identity::{ExternalUserId, IdentityRepository, VerifiedIdentity};
use crate::domain::team::{
    place_in_bucket, validate_team_name, BucketPlacement, ChannelBundle, Team, TeamError, TeamId,
    TeamRepository, DEFAULT_BUCKET_SIZE, DEFAULT_MAX_TEAM_NAME_LENGTH,
};
use crate::domain::{DisbandReason, DomainError, EventPublisher, TeamEvent};
use crate::infrastructure::locks::KeyedLocks;
use crate::infrastructure::scheduler::DeadlineScheduler;

pub const DEFAULT_MAX_TEAM_SIZE: usize = 4;
pub const DEFAULT_FORMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Tunable team rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamSettings {
    pub max_size: usize,
    pub formation_timeout: Duration,
    pub bucket_size: u32,
    pub max_name_length: usize,
}

impl Default for TeamSettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_TEAM_SIZE,
            formation_timeout: DEFAULT_FORMATION_TIMEOUT,
            bucket_size: DEFAULT_BUCKET_SIZE,
            max_name_length: DEFAULT_MAX_TEAM_NAME_LENGTH,
        }
    }
}

/// A team and its members at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSnapshot {
    pub team: Team,
    pub members: Vec<VerifiedIdentity>,
}

/// Team service
///
/// Every read-check-write against one team runs under that team's lock, and
/// every change to an identity's team goes through the repository's
/// compare-and-set. Only one team lock is ever held at a time.
#[derive(Debug, Clone)]
pub struct TeamService {
    teams: Arc<dyn TeamRepository>,
    identities: Arc<dyn IdentityRepository>,
    locks: Arc<KeyedLocks<TeamId>>,
    scheduler: Arc<dyn DeadlineScheduler>,
    events: Arc<dyn EventPublisher>,
    settings: TeamSettings,
}

impl TeamService {
    pub fn new(
        teams: Arc<dyn TeamRepository>,
        identities: Arc<dyn IdentityRepository>,
        scheduler: Arc<dyn DeadlineScheduler>,
        events: Arc<dyn EventPublisher>,
        settings: TeamSettings,
    ) -> Self {
        Self {
            teams,
            identities,
            locks: Arc::new(KeyedLocks::new()),
            scheduler,
            events,
            settings,
        }
    }

    pub fn settings(&self) -> &TeamSettings {
        &self.settings
    }

    /// Create a team owned by `owner` and arm its formation deadline
    pub async fn create_team(&self, owner: ExternalUserId, name: &str) -> Result<Team, TeamError> {
        let name = validate_team_name(name, self.settings.max_name_length)?;

        let identity = self.identities.get(owner).await?;
        match identity {
            Some(identity) if identity.role().can_join_teams() => {
                if identity.is_teamed() {
                    debug!(owner = %owner, "Owner already on a team");
                    return Err(TeamError::AlreadyTeamed);
                }
            }
            _ => return Err(TeamError::OwnerUnverified),
        }

        if self.teams.find_by_name(&name).await?.is_some() {
            debug!(name = %name, "Team name taken");
            return Err(TeamError::NameTaken { name });
        }

        let team = self.teams.create(&name).await.map_err(|e| match e {
            DomainError::Conflict { .. } => TeamError::NameTaken { name: name.clone() },
            e => e.into(),
        })?;
        let team_id = team.id();

        let _guard = self.locks.lock(team_id).await;

        // Armed first: it sweeps up a half-created team if the rollback below
        // also fails
        self.arm_formation_deadline(team_id);

        let placement = match self.claim_owner(team_id, owner).await {
            Ok(placement) => placement,
            Err(e) => {
                self.discard_team(team_id, owner).await;
                return Err(e);
            }
        };

        info!(team_id = %team_id, name = %team.name(), owner = %owner, "Team created");
        self.events.publish(TeamEvent::TeamCreated {
            team: team.clone(),
            placement,
        });
        self.events
            .publish(TeamEvent::membership(owner, None, Some(team_id)));

        Ok(team)
    }

    // Caller holds the team lock
    async fn claim_owner(
        &self,
        team_id: TeamId,
        owner: ExternalUserId,
    ) -> Result<BucketPlacement, TeamError> {
        if self.teams.get(team_id).await?.is_none() {
            return Err(TeamError::TeamNotFound(team_id));
        }

        if !self.identities.assign_team(owner, None, Some(team_id)).await? {
            // Owner joined or created another team concurrently
            return Err(TeamError::AlreadyTeamed);
        }

        let existing = self.teams.existing_ids().await?;
        Ok(place_in_bucket(team_id, &existing, self.settings.bucket_size))
    }

    // Undo a failed create_team. Caller holds the team lock. The formation
    // deadline stays armed unless the team is known to be gone.
    async fn discard_team(&self, team_id: TeamId, owner: ExternalUserId) {
        if let Err(e) = self
            .identities
            .assign_team(owner, Some(team_id), None)
            .await
        {
            warn!(team_id = %team_id, owner = %owner, error = %e, "Failed to release owner of discarded team");
            return;
        }

        match self.teams.delete(team_id).await {
            Ok(_) => {
                self.scheduler.cancel(team_id);
                debug!(team_id = %team_id, "Discarded partially created team");
            }
            Err(e) => {
                warn!(team_id = %team_id, error = %e, "Failed to delete discarded team");
            }
        }
    }

    fn arm_formation_deadline(&self, team_id: TeamId) {
        let service = self.clone();
        let job = async move {
            if let Err(e) = service.expire_formation(team_id).await {
                warn!(team_id = %team_id, error = %e, "Formation deadline check failed");
            }
        }
        .boxed();

        self.scheduler
            .schedule(team_id, self.settings.formation_timeout, job);
    }

    /// Add `target` to the actor's team
    pub async fn add_member(
        &self,
        actor: ExternalUserId,
        target: ExternalUserId,
    ) -> Result<TeamId, TeamError> {
        let team_id = self
            .current_team(actor)
            .await?
            .ok_or(TeamError::ActorNotTeamed)?;

        let _guard = self.locks.lock(team_id).await;

        // The actor may have left between the lookup and the lock
        if self.current_team(actor).await? != Some(team_id) {
            return Err(TeamError::ActorNotTeamed);
        }

        if self.identities.count_members(team_id).await? >= self.settings.max_size {
            debug!(team_id = %team_id, "Team full");
            return Err(TeamError::TeamFull {
                max: self.settings.max_size,
            });
        }

        let target_identity = match self.identities.get(target).await? {
            Some(identity) if identity.role().can_join_teams() => identity,
            _ => return Err(TeamError::TargetUnverified),
        };

        if target_identity.is_teamed()
            || !self
                .identities
                .assign_team(target, None, Some(team_id))
                .await?
        {
            debug!(team_id = %team_id, target = %target, "Target already teamed");
            return Err(TeamError::TargetAlreadyTeamed);
        }

        info!(team_id = %team_id, actor = %actor, member = %target, "Member added");
        self.events
            .publish(TeamEvent::membership(target, None, Some(team_id)));
        Ok(team_id)
    }

    /// Remove `user` from their team, deleting the team if it becomes empty
    pub async fn leave_team(&self, user: ExternalUserId) -> Result<(), TeamError> {
        loop {
            let team_id = self.current_team(user).await?.ok_or(TeamError::NotTeamed)?;
            let _guard = self.locks.lock(team_id).await;

            // Membership only changes under the team lock, so the count below
            // holds until the guard drops
            if self.current_team(user).await? != Some(team_id) {
                continue;
            }

            let team = if self.identities.count_members(team_id).await? <= 1 {
                self.teams.get(team_id).await?
            } else {
                None
            };

            if let Some(team) = team {
                info!(team_id = %team_id, member = %user, "Last member left");
                // Clears the membership and deletes the team together
                self.remove_team(team, DisbandReason::Emptied).await?;
                return Ok(());
            }

            if !self
                .identities
                .assign_team(user, Some(team_id), None)
                .await?
            {
                continue;
            }

            info!(team_id = %team_id, member = %user, "Member left");
            self.events
                .publish(TeamEvent::membership(user, Some(team_id), None));
            return Ok(());
        }
    }

    /// Rename the actor's team
    pub async fn rename_team(&self, actor: ExternalUserId, name: &str) -> Result<Team, TeamError> {
        let name = validate_team_name(name, self.settings.max_name_length)?;

        let team_id = self
            .current_team(actor)
            .await?
            .ok_or(TeamError::ActorNotTeamed)?;
        let _guard = self.locks.lock(team_id).await;

        if self.current_team(actor).await? != Some(team_id) {
            return Err(TeamError::ActorNotTeamed);
        }

        match self.teams.find_by_name(&name).await? {
            Some(existing) if existing.id() == team_id => return Ok(existing),
            Some(_) => return Err(TeamError::NameTaken { name }),
            None => {}
        }

        let team = self.teams.rename(team_id, &name).await.map_err(|e| match e {
            DomainError::Conflict { .. } => TeamError::NameTaken { name: name.clone() },
            DomainError::NotFound { .. } => TeamError::TeamNotFound(team_id),
            e => e.into(),
        })?;

        info!(team_id = %team_id, name = %team.name(), "Team renamed");
        Ok(team)
    }

    /// Organizer-initiated removal of a team and all its memberships
    pub async fn disband_team(&self, team_id: TeamId) -> Result<Team, TeamError> {
        let _guard = self.locks.lock(team_id).await;

        let team = self
            .teams
            .get(team_id)
            .await?
            .ok_or(TeamError::TeamNotFound(team_id))?;

        self.remove_team(team.clone(), DisbandReason::Organizer).await?;
        Ok(team)
    }

    /// Formation deadline check: disband the team if it still has at most one
    /// member. Returns true if the team was disbanded.
    pub async fn expire_formation(&self, team_id: TeamId) -> Result<bool, TeamError> {
        let _guard = self.locks.lock(team_id).await;

        let Some(team) = self.teams.get(team_id).await? else {
            debug!(team_id = %team_id, "Formation deadline for a removed team");
            return Ok(false);
        };

        let members = self.identities.count_members(team_id).await?;
        if members > 1 {
            debug!(team_id = %team_id, members, "Team formed before deadline");
            return Ok(false);
        }

        self.remove_team(team, DisbandReason::FormationTimeout).await?;
        Ok(true)
    }

    // Caller holds the team lock. A failure part way re-arms the formation
    // deadline, which finishes the job once the team is down to one member.
    async fn remove_team(&self, team: Team, reason: DisbandReason) -> Result<(), TeamError> {
        let team_id = team.id();

        if let Err(e) = self.clear_and_delete(team_id).await {
            warn!(team_id = %team_id, error = %e, "Team removal interrupted");
            self.arm_formation_deadline(team_id);
            return Err(e);
        }

        self.scheduler.cancel(team_id);

        info!(team_id = %team_id, name = %team.name(), reason = ?reason, "Team disbanded");
        self.events.publish(TeamEvent::TeamDisbanded { team, reason });
        Ok(())
    }

    async fn clear_and_delete(&self, team_id: TeamId) -> Result<(), TeamError> {
        for member in self.identities.list_members(team_id).await? {
            let user_id = member.user_id();
            if self
                .identities
                .assign_team(user_id, Some(team_id), None)
                .await?
            {
                self.events
                    .publish(TeamEvent::membership(user_id, Some(team_id), None));
            }
        }

        self.teams.delete(team_id).await?;
        Ok(())
    }

    /// Record the chat-platform resources provisioned for a team
    pub async fn attach_channels(
        &self,
        team_id: TeamId,
        channels: ChannelBundle,
    ) -> Result<Team, TeamError> {
        let _guard = self.locks.lock(team_id).await;

        self.teams
            .attach_channels(team_id, channels)
            .await
            .map_err(|e| match e {
                DomainError::NotFound { .. } => TeamError::TeamNotFound(team_id),
                e => e.into(),
            })
    }

    /// Where a team's channels belong among the currently existing teams
    pub async fn placement(&self, team_id: TeamId) -> Result<BucketPlacement, TeamError> {
        let existing = self.teams.existing_ids().await?;
        Ok(place_in_bucket(team_id, &existing, self.settings.bucket_size))
    }

    pub async fn get_team(&self, team_id: TeamId) -> Result<Option<Team>, TeamError> {
        Ok(self.teams.get(team_id).await?)
    }

    /// The team `user` is on, if any
    pub async fn team_of(&self, user: ExternalUserId) -> Result<Option<Team>, TeamError> {
        match self.current_team(user).await? {
            Some(team_id) => Ok(self.teams.get(team_id).await?),
            None => Ok(None),
        }
    }

    pub async fn members(&self, team_id: TeamId) -> Result<Vec<VerifiedIdentity>, TeamError> {
        Ok(self.identities.list_members(team_id).await?)
    }

    /// Every existing team with its members, ordered by team id.
    ///
    /// Each team is read under its own lock, so every snapshot is consistent
    /// for that team; teams removed after the listing are left out.
    pub async fn snapshot(&self) -> Result<Vec<TeamSnapshot>, TeamError> {
        let mut snapshots = Vec::new();

        for listed in self.teams.list().await? {
            let team_id = listed.id();
            let _guard = self.locks.lock(team_id).await;

            let Some(team) = self.teams.get(team_id).await? else {
                continue;
            };
            let members = self.identities.list_members(team_id).await?;
            snapshots.push(TeamSnapshot { team, members });
        }

        Ok(snapshots)
    }

    async fn current_team(&self, user: ExternalUserId) -> Result<Option<TeamId>, TeamError> {
        Ok(self
            .identities
            .get(user)
            .await?
            .and_then(|identity| identity.team_id()))
    }
}
