pub mod auth;
pub mod comments;
pub mod content;
pub mod moderation;
pub mod monitoring;
pub mod points;
