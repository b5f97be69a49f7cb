//! Registered accounts and point-in-time snapshots of them.

use serde::Serialize;
use std::collections::BTreeSet;

/// A registered account as held by the store.
///
/// Edges are stored by username on both ends; `Store` keeps
/// `a ∈ b.followers ⇔ b ∈ a.follows` after every mutation.
#[derive(Debug)]
pub(crate) struct User {
    pub username: String,
    credential: String,
    /// Accounts this user follows.
    pub follows: BTreeSet<String>,
    /// Accounts following this user.
    pub followers: BTreeSet<String>,
}

impl User {
    pub fn new(username: &str, credential: &str) -> Self {
        Self {
            username: username.to_string(),
            credential: credential.to_string(),
            follows: BTreeSet::new(),
            followers: BTreeSet::new(),
        }
    }

    /// Exact comparison against the stored credential.
    pub fn credential_matches(&self, candidate: &str) -> bool {
        self.credential == candidate
    }

    /// Copy the public state out. Later mutation never reaches the copy.
    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            username: self.username.clone(),
            follows: self.follows.iter().cloned().collect(),
            followers: self.followers.iter().cloned().collect(),
        }
    }
}

/// Immutable copy of a user handed out to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSnapshot {
    pub username: String,
    /// Sorted usernames this user follows.
    pub follows: Vec<String>,
    /// Sorted usernames following this user.
    pub followers: Vec<String>,
}

impl UserSnapshot {
    pub fn is_following(&self, username: &str) -> bool {
        self.follows.iter().any(|u| u == username)
    }
}
