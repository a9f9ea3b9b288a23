//! Change notifications for contributor writes.
//!
//! Delivery is best-effort: events published while nobody is subscribed
//! are discarded, and a subscriber that falls more than `capacity` events
//! behind loses the oldest ones and continues with newer events. Nothing is
//! replayed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{Contributor, ContributorId};

/// A committed change to a contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContributorEvent {
    /// A contributor was created.
    Created { contributor: Contributor },

    /// An existing contributor was replaced.
    Updated { contributor: Contributor },

    /// A contributor was deleted; carries the last stored state.
    Deleted { contributor: Contributor },
}

impl ContributorEvent {
    pub fn contributor(&self) -> &Contributor {
        match self {
            Self::Created { contributor } | Self::Updated { contributor } | Self::Deleted { contributor } => {
                contributor
            }
        }
    }

    pub fn id(&self) -> &ContributorId {
        &self.contributor().id
    }
}

/// Publisher side of the change channel.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ContributorEvent>,
}

impl ChangeNotifier {
    /// Create a notifier buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event, returning how many subscribers will see it.
    pub fn publish(&self, event: ContributorEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!("change event dropped, no subscribers");
                0
            }
        }
    }

    /// Start receiving events published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription { rx: self.tx.subscribe() }
    }
}

/// A lazy per-subscriber event sequence. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<ContributorEvent>,
}

impl Subscription {
    /// Wait for the next event.
    ///
    /// Returns `None` once the notifier and all its clones are gone.
    pub async fn next(&mut self) -> Option<ContributorEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
