//! State management module.
//!
//! Contains the social store and the entities it owns.

pub mod annotate;
mod message;
mod store;
mod uid;
mod user;

pub use message::{Message, MessageId, Poster};
pub use store::{Store, StoreOptions, StoreStats, is_valid_username};
pub use uid::ClientId;
pub use user::UserSnapshot;
