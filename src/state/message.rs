//! Posted messages and their wire representation.

use super::annotate;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, strictly increasing message identifier. The first post gets 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl MessageId {
    /// The identifier after this one.
    #[inline]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Public identity of a poster. The credential never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poster {
    pub username: String,
}

/// A message posted by a user. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Stored verbatim.
    pub text: String,
    pub poster: Poster,
    #[serde(rename = "posted")]
    pub posted_at: DateTime<FixedOffset>,
    /// `@mentions` as typed, in order, duplicates kept.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,
    /// `#tags` lower-cased, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Message {
    /// Build a message, annotating mentions and tags from `text`.
    pub fn new(
        id: MessageId,
        poster: &str,
        text: impl Into<String>,
        posted_at: DateTime<FixedOffset>,
    ) -> Self {
        let text = text.into();
        Self {
            id,
            mentions: annotate::mentions(&text),
            tags: annotate::tags(&text),
            text,
            poster: Poster {
                username: poster.to_string(),
            },
            posted_at,
        }
    }

    /// Whether `username` is mentioned anywhere in the text.
    pub fn mentions_user(&self, username: &str) -> bool {
        self.mentions.iter().any(|m| m == username)
    }
}
