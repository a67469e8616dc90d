//! Application services: use cases over the repository traits.

pub mod accounts;
pub mod audit;
pub mod chapters;
pub mod comments;
pub mod content;
pub mod engagement;
pub mod error;
pub mod monitoring;
pub mod pagination;
pub mod points;
pub mod repos;
pub mod sessions;
