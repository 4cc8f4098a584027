//! Event publishers

use tokio::sync::broadcast;
use tracing::info;

use crate::domain::{EventPublisher, TeamEvent};

/// Writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: TeamEvent) {
        match &event {
            TeamEvent::TeamCreated { team, placement } => info!(
                event = event.kind(),
                team_id = %team.id(),
                team_name = %team.name(),
                bucket = ?placement.label(),
                anchor = ?placement.anchor().map(|id| id.value()),
                "Team created"
            ),
            TeamEvent::TeamDisbanded { team, reason } => info!(
                event = event.kind(),
                team_id = %team.id(),
                team_name = %team.name(),
                reason = ?reason,
                "Team disbanded"
            ),
            TeamEvent::MembershipChanged {
                user_id,
                before,
                after,
            } => info!(
                event = event.kind(),
                user_id = %user_id,
                before = ?before.map(|id| id.value()),
                after = ?after.map(|id| id.value()),
                "Membership changed"
            ),
        }
    }
}

/// Fans events out to any number of in-process subscribers.
///
/// Publishing never waits: with no subscribers the event is dropped, and a
/// subscriber that falls more than `capacity` events behind skips ahead.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<TeamEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TeamEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: TeamEvent) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }
}

/// Publishes to several sinks in order
#[derive(Debug, Default)]
pub struct FanoutEventPublisher {
    sinks: Vec<std::sync::Arc<dyn EventPublisher>>,
}

impl FanoutEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: std::sync::Arc<dyn EventPublisher>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventPublisher for FanoutEventPublisher {
    fn publish(&self, event: TeamEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.publish(event.clone());
            }
            last.publish(event);
        }
    }
}
