//! End-to-end registration, verification and team scenarios

use std::sync::Arc;
use std::time::Duration;

use hackathon_registrar::domain::{ExternalUserId, Role, TeamError, VerificationError};
use hackathon_registrar::infrastructure::storage::RecordStore;
use hackathon_registrar::infrastructure::team::TeamSettings;
use hackathon_registrar::{create_services_with_store, Services};

fn services() -> Services {
    create_services_with_store(RecordStore::in_memory(), TeamSettings::default())
}

async fn verified_participant(services: &Services, id: u64) -> ExternalUserId {
    let user = ExternalUserId::new(id);
    let email = format!("p{}@x.com", id);
    let handle = format!("p#{}", id);

    services
        .registrations
        .submit(Role::Participant, &email, &handle)
        .await
        .unwrap();
    services
        .verification
        .verify(user, &handle, &email, Role::Participant)
        .await
        .unwrap();
    user
}

#[tokio::test]
async fn verify_twice_reports_already_verified() {
    let services = services();
    services
        .registrations
        .submit(Role::Participant, "a@x.com", "alice#1")
        .await
        .unwrap();
    let alice = ExternalUserId::new(1);

    let identity = services
        .verification
        .verify(alice, "alice#1", "a@x.com", Role::Participant)
        .await
        .unwrap();
    assert!(identity.team_id().is_none());

    let second = services
        .verification
        .verify(alice, "alice#1", "a@x.com", Role::Participant)
        .await;
    assert_eq!(
        second.unwrap_err(),
        VerificationError::AlreadyVerified {
            role: Role::Participant
        }
    );
}

#[tokio::test(start_paused = true)]
async fn lonely_team_is_disbanded_at_formation_deadline() {
    let services = services();
    let alice = verified_participant(&services, 1).await;

    let team = services.teams.create_team(alice, "Rockets").await.unwrap();

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(services.teams.get_team(team.id()).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(services.teams.get_team(team.id()).await.unwrap().is_none());
    assert!(services.teams.team_of(alice).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn formed_team_survives_formation_deadline() {
    let services = services();
    let alice = verified_participant(&services, 1).await;
    let bob = verified_participant(&services, 2).await;

    let team = services.teams.create_team(alice, "Rockets").await.unwrap();
    services.teams.add_member(alice, bob).await.unwrap();

    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(services.teams.get_team(team.id()).await.unwrap().is_some());
    assert_eq!(services.teams.members(team.id()).await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn manual_disband_before_deadline_makes_deadline_a_noop() {
    let services = services();
    let alice = verified_participant(&services, 1).await;
    let bob = verified_participant(&services, 2).await;

    let first = services.teams.create_team(alice, "Rockets").await.unwrap();
    services.teams.disband_team(first.id()).await.unwrap();

    // A new team under the same name must not be touched by the old deadline
    tokio::time::sleep(Duration::from_secs(30)).await;
    let second = services.teams.create_team(bob, "Rockets").await.unwrap();
    services.teams.add_member(bob, alice).await.unwrap();

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert!(services.teams.get_team(second.id()).await.unwrap().is_some());
}

#[tokio::test]
async fn name_is_freed_when_last_member_leaves() {
    let services = services();
    let alice = verified_participant(&services, 1).await;

    let first = services.teams.create_team(alice, "Foo").await.unwrap();
    services.teams.leave_team(alice).await.unwrap();
    assert!(services.teams.get_team(first.id()).await.unwrap().is_none());

    let second = services.teams.create_team(alice, "Foo").await.unwrap();
    assert_ne!(first.id(), second.id());
}

#[tokio::test]
async fn duplicate_team_name_is_rejected() {
    let services = services();
    let alice = verified_participant(&services, 1).await;
    let bob = verified_participant(&services, 2).await;

    services.teams.create_team(alice, "AB").await.unwrap();
    let result = services.teams.create_team(bob, "AB").await;

    assert!(matches!(result, Err(TeamError::NameTaken { .. })));
}

#[tokio::test]
async fn fifth_member_is_rejected() {
    let services = services();
    let owner = verified_participant(&services, 1).await;
    let team = services.teams.create_team(owner, "Full").await.unwrap();

    for id in 2..=4 {
        let member = verified_participant(&services, id).await;
        services.teams.add_member(owner, member).await.unwrap();
    }

    let fifth = verified_participant(&services, 5).await;
    assert_eq!(
        services.teams.add_member(owner, fifth).await.unwrap_err(),
        TeamError::TeamFull { max: 4 }
    );
    assert_eq!(services.teams.members(team.id()).await.unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_never_overfill_a_team() {
    let services = services();
    let owner = verified_participant(&services, 1).await;
    let team = services.teams.create_team(owner, "Crowded").await.unwrap();

    let mut candidates = Vec::new();
    for id in 2..=20 {
        candidates.push(verified_participant(&services, id).await);
    }

    let services = Arc::new(services);
    let mut handles = Vec::new();
    for candidate in candidates {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services.teams.add_member(owner, candidate).await
        }));
    }

    let mut added = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => added += 1,
            Err(TeamError::TeamFull { .. }) => {}
            Err(other) => panic!("Unexpected error {:?}", other),
        }
    }

    assert_eq!(added, 3);
    assert_eq!(services.teams.members(team.id()).await.unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn target_claimed_by_two_teams_joins_only_one() {
    let services = Arc::new(services());
    let alice = verified_participant(&services, 1).await;
    let bob = verified_participant(&services, 2).await;
    let carol = verified_participant(&services, 3).await;

    services.teams.create_team(alice, "Rockets").await.unwrap();
    services.teams.create_team(bob, "Comets").await.unwrap();

    let a = {
        let services = services.clone();
        tokio::spawn(async move { services.teams.add_member(alice, carol).await })
    };
    let b = {
        let services = services.clone();
        tokio::spawn(async move { services.teams.add_member(bob, carol).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(TeamError::TargetAlreadyTeamed))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_joins_and_leaves_respect_max_size() {
    let services = Arc::new(services());
    let owner = verified_participant(&services, 1).await;
    let team_id = services.teams.create_team(owner, "Churn").await.unwrap().id();

    let mut members = Vec::new();
    for id in 2..=12 {
        members.push(verified_participant(&services, id).await);
    }

    let mut handles = Vec::new();
    for (i, member) in members.into_iter().enumerate() {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..5 {
                if services.teams.add_member(owner, member).await.is_ok() {
                    let size = services.teams.members(team_id).await.unwrap().len();
                    assert!(size <= 4, "team grew to {}", size);
                    if i % 2 == 0 {
                        services.teams.leave_team(member).await.unwrap();
                    }
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert!(services.teams.members(team_id).await.unwrap().len() <= 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deadline_check_racing_a_join_never_strands_members() {
    let services = Arc::new(services());

    for round in 0..20u64 {
        let owner = verified_participant(&services, 100 + round * 2).await;
        let joiner = verified_participant(&services, 101 + round * 2).await;
        let team_id = services
            .teams
            .create_team(owner, &format!("Racers {}", round))
            .await
            .unwrap()
            .id();

        let expire = {
            let services = services.clone();
            tokio::spawn(async move { services.teams.expire_formation(team_id).await })
        };
        let join = {
            let services = services.clone();
            tokio::spawn(async move { services.teams.add_member(owner, joiner).await })
        };

        let disbanded = expire.await.unwrap().unwrap();
        let joined = join.await.unwrap();

        match (disbanded, joined) {
            (false, Ok(_)) => {
                assert_eq!(services.teams.members(team_id).await.unwrap().len(), 2);
            }
            (true, Err(TeamError::ActorNotTeamed)) => {
                assert!(services.teams.get_team(team_id).await.unwrap().is_none());
                assert!(services.teams.team_of(owner).await.unwrap().is_none());
                assert!(services.teams.team_of(joiner).await.unwrap().is_none());
            }
            other => panic!("Unexpected outcome {:?}", other),
        }
    }
}
