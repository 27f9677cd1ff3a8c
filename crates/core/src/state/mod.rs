//! # Persistence
//!
//! SQLite-backed state shared by the local backend and the share views.

pub mod db;
pub mod payloads;
pub mod shares;
pub mod startups;

pub use db::MatchDb;
pub use payloads::PayloadStore;
pub use shares::{ShareComment, ShareError, ShareManager, SharedEntity, SharedList};
pub use startups::{StartupDirectory, StartupRecord};
