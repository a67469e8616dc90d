mod commands;
mod queries;
mod service;
pub mod types;

pub use service::*;
pub use types::{
    ContentItem, ContentOptions, ContentSnapshot, CreateContentCommand, Decision,
    ListContentQuery, UpdateContentCommand,
};
