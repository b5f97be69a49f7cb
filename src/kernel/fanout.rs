//! Notification fan-out.
//!
//! Runs inside the kernel worker right after a commit. It only enqueues:
//! each interested client gets the event once on its own queue and its own
//! delivery task does the (possibly slow) push. A client whose queue is full
//! is evicted rather than skipped.

use super::subscriber::{Notification, Offer, Subscriber};
use crate::state::Message;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// A follow-graph edge change, pushed to the follower's own clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionChange {
    pub followee: String,
    pub follower: String,
    pub unfollow: bool,
}

/// A committed post plus the poster's followers as of the commit.
///
/// Both halves are owned copies, so later graph mutation cannot change who
/// this event concerns.
#[derive(Debug)]
pub struct PostEvent {
    message: Arc<Message>,
    followers: BTreeSet<String>,
}

impl PostEvent {
    pub fn new(message: Arc<Message>, followers: BTreeSet<String>) -> Self {
        Self { message, followers }
    }

    pub fn message(&self) -> &Arc<Message> {
        &self.message
    }

    /// Whether a client logged in as `username` wants this post: it is the
    /// poster, it is mentioned, or it follows the poster.
    pub fn concerns(&self, username: &str) -> bool {
        self.message.poster.username == username
            || self.message.mentions_user(username)
            || self.followers.contains(username)
    }
}

/// What happened to one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanoutReport {
    /// Subscribers the event was queued for.
    pub queued: usize,
    /// Subscribers evicted because their queue was full.
    pub evicted: usize,
    /// Subscribers whose delivery task had already stopped.
    pub closed: usize,
}

impl FanoutReport {
    /// Whether any registration needs pruning after this fan-out.
    pub fn needs_prune(&self) -> bool {
        self.evicted > 0 || self.closed > 0
    }

    fn record(&mut self, offer: Offer, sub: &Subscriber) {
        match offer {
            Offer::Queued => self.queued += 1,
            Offer::Full => {
                warn!(
                    client = %sub.client_id(),
                    username = %sub.username(),
                    "Notification queue full; evicting client"
                );
                self.evicted += 1;
            }
            Offer::Closed => self.closed += 1,
        }
    }
}

/// Offer a post to every client it concerns, once per client even when the
/// client holds registrations under several accounts.
pub fn fan_out_post<'a>(
    subscribers: impl IntoIterator<Item = &'a Subscriber>,
    event: &PostEvent,
) -> FanoutReport {
    let message = event.message();
    let mut report = FanoutReport::default();
    let mut offered = HashSet::new();

    for sub in subscribers {
        if !event.concerns(sub.username()) || !offered.insert(sub.client_id()) {
            continue;
        }
        let offer = sub.offer(Notification::Post(Arc::clone(message)));
        report.record(offer, sub);
    }

    debug!(
        id = %message.id,
        poster = %message.poster.username,
        queued = report.queued,
        "Post fan-out"
    );
    crate::metrics::record_fanout(&report);
    report
}

/// Offer an edge change to every subscriber logged in as the follower.
pub fn fan_out_subscription<'a>(
    subscribers: impl IntoIterator<Item = &'a Subscriber>,
    change: SubscriptionChange,
) -> FanoutReport {
    let change = Arc::new(change);
    let mut report = FanoutReport::default();

    for sub in subscribers {
        if sub.username() != change.follower {
            continue;
        }
        let offer = sub.offer(Notification::Subscription(Arc::clone(&change)));
        report.record(offer, sub);
    }

    debug!(
        followee = %change.followee,
        follower = %change.follower,
        unfollow = change.unfollow,
        queued = report.queued,
        "Subscription fan-out"
    );
    crate::metrics::record_fanout(&report);
    report
}
