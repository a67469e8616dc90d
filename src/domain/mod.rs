//! Domain layer types and invariants.

pub mod comments;
pub mod engagement;
pub mod entities;
pub mod error;
pub mod moderation;
pub mod points;
pub mod tags;
pub mod types;
pub mod users;
