//! The social store: users, the follow graph, the message log and the
//! active-listener registry.
//!
//! Not thread-safe by construction. The kernel worker is its only owner and
//! calls into it one request at a time.

use super::user::User;
use super::{ClientId, Message, MessageId, UserSnapshot};
use crate::error::StoreError;
use crate::kernel::Subscriber;
use chrono::Local;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Counters reported by [`Store::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub users: usize,
    pub messages: usize,
    pub listeners: usize,
}

/// Store behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Report an unknown username at login as `InvalidCredentials`, so login
    /// responses do not reveal which accounts exist.
    pub conceal_unknown_users: bool,
}

/// Authoritative in-memory state.
#[derive(Debug, Default)]
pub struct Store {
    options: StoreOptions,
    last_id: MessageId,
    messages: BTreeMap<MessageId, Arc<Message>>,
    users: HashMap<String, User>,
    listeners: HashMap<String, Vec<Subscriber>>,
}

/// Usernames are one or more ASCII word characters.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Create an account with empty follow sets.
    pub fn register(&mut self, username: &str, password: &str) -> Result<(), StoreError> {
        if !is_valid_username(username) {
            return Err(StoreError::InvalidUsername);
        }
        if password.is_empty() {
            return Err(StoreError::InvalidPassword);
        }
        if self.users.contains_key(username) {
            return Err(StoreError::UsernameTaken);
        }

        self.users
            .insert(username.to_string(), User::new(username, password));
        Ok(())
    }

    /// Verify credentials and, only on success, register `subscriber` as an
    /// active listener for the account.
    ///
    /// A failed login leaves any earlier registration of the same handle
    /// untouched.
    pub fn login(
        &mut self,
        username: &str,
        password: &str,
        subscriber: Subscriber,
    ) -> Result<UserSnapshot, StoreError> {
        if !is_valid_username(username) {
            return Err(StoreError::InvalidUsername);
        }
        if password.is_empty() {
            return Err(StoreError::InvalidPassword);
        }

        let Some(user) = self.users.get(username) else {
            return Err(if self.options.conceal_unknown_users {
                StoreError::InvalidCredentials
            } else {
                StoreError::UnknownUser(username.to_string())
            });
        };

        if !user.credential_matches(password) {
            return Err(StoreError::InvalidCredentials);
        }

        let snapshot = user.snapshot();
        let subs = self.listeners.entry(username.to_string()).or_default();
        // A handle logging in again replaces its earlier registration.
        subs.retain(|s| s.client_id() != subscriber.client_id());
        subs.push(subscriber);

        Ok(snapshot)
    }

    /// Remove one client registration. Unknown users or handles are a no-op.
    pub fn logout(&mut self, username: &str, client_id: ClientId) {
        if !self.users.contains_key(username) {
            return;
        }

        if let Some(subs) = self.listeners.get_mut(username) {
            subs.retain(|s| s.client_id() != client_id);
            if subs.is_empty() {
                self.listeners.remove(username);
            }
        }
    }

    /// Append a message for a registered user and return its id.
    pub fn post(&mut self, username: &str, text: &str) -> Result<MessageId, StoreError> {
        if !self.users.contains_key(username) {
            return Err(StoreError::UnknownUser(username.to_string()));
        }

        let id = self.last_id.next();
        let message = Message::new(id, username, text, Local::now().fixed_offset());

        self.last_id = id;
        self.messages.insert(id, Arc::new(message));
        Ok(id)
    }

    /// Make `follower` follow `followee`. Following twice is a no-op.
    pub fn follow(&mut self, followee: &str, follower: &str) -> Result<(), StoreError> {
        self.check_edge(followee, follower)?;

        if let Some(user) = self.users.get_mut(follower) {
            user.follows.insert(followee.to_string());
        }
        if let Some(user) = self.users.get_mut(followee) {
            user.followers.insert(follower.to_string());
        }
        Ok(())
    }

    /// Remove the edge if present. Unfollowing a stranger is a no-op.
    pub fn unfollow(&mut self, followee: &str, follower: &str) -> Result<(), StoreError> {
        self.check_edge(followee, follower)?;

        if let Some(user) = self.users.get_mut(follower) {
            user.follows.remove(followee);
        }
        if let Some(user) = self.users.get_mut(followee) {
            user.followers.remove(follower);
        }
        Ok(())
    }

    fn check_edge(&self, followee: &str, follower: &str) -> Result<(), StoreError> {
        if followee == follower {
            return Err(StoreError::SelfFollow);
        }
        for name in [followee, follower] {
            if !self.users.contains_key(name) {
                return Err(StoreError::UnknownUser(name.to_string()));
            }
        }
        Ok(())
    }

    /// Every message posted by `username`. Callers must not rely on the order.
    pub fn messages(&self, username: &str) -> Vec<Arc<Message>> {
        if !self.users.contains_key(username) {
            return Vec::new();
        }

        self.messages
            .values()
            .filter(|m| m.poster.username == username)
            .cloned()
            .collect()
    }

    /// Every message whose raw text contains `"#" + lowercase(tag)`.
    ///
    /// This is a substring match on the stored text, not a lookup in the
    /// parsed `tags`; the two disagree for tags with punctuation or upper case.
    pub fn tagged(&self, tag: &str) -> Vec<Arc<Message>> {
        let needle = format!("#{}", tag.to_lowercase());

        self.messages
            .values()
            .filter(|m| m.text.contains(&needle))
            .cloned()
            .collect()
    }

    pub fn message(&self, id: MessageId) -> Option<Arc<Message>> {
        self.messages.get(&id).cloned()
    }

    pub fn user(&self, username: &str) -> Option<UserSnapshot> {
        self.users.get(username).map(User::snapshot)
    }

    /// Owned copy of the accounts following `username`.
    pub fn followers_of(&self, username: &str) -> BTreeSet<String> {
        self.users
            .get(username)
            .map(|u| u.followers.clone())
            .unwrap_or_default()
    }

    /// Every live registration, across all accounts.
    pub fn listeners(&self) -> impl Iterator<Item = &Subscriber> {
        self.listeners.values().flatten()
    }

    /// Registrations for one account.
    pub fn listeners_of(&self, username: &str) -> &[Subscriber] {
        self.listeners
            .get(username)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// A live registration of `client_id` under any account.
    pub fn subscriber_for(&self, client_id: ClientId) -> Option<&Subscriber> {
        self.listeners()
            .find(|s| s.client_id() == client_id && s.is_live())
    }

    /// Drop registrations whose delivery task has stopped or whose client
    /// was evicted. Returns how many.
    pub fn prune_listeners(&mut self) -> usize {
        let mut removed = 0;
        self.listeners.retain(|_, subs| {
            let before = subs.len();
            subs.retain(Subscriber::is_live);
            removed += before - subs.len();
            !subs.is_empty()
        });
        removed
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            users: self.users.len(),
            messages: self.messages.len(),
            listeners: self.listeners.values().map(Vec::len).sum(),
        }
    }
}
