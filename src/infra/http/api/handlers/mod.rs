//! API handlers organized by resource.

mod admin;
mod auth;
mod chapters;
mod comments;
mod content;
mod users;

pub use admin::*;
pub use auth::*;
pub use chapters::*;
pub use comments::*;
pub use content::*;
pub use users::*;

// ----- Shared query structs -----

use serde::Deserialize;

use crate::application::pagination::PageRequest;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}
