//! Client library and command-line front end for the Storyloft API.
//!
//! [`client::ApiClient`] owns the [`session::SessionStore`] and performs the
//! single refresh-and-retry on `401`; [`optimistic::Optimistic`] backs the
//! like and vote toggles.
#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod args;
pub mod client;
pub mod error;
pub mod handlers;
pub mod io;
pub mod optimistic;
pub mod print;
pub mod session;

use args::Cli;
use client::ApiClient;
use error::ClientError;
use session::SessionStore;

/// Builds a client from parsed arguments, restoring the saved session.
pub async fn build_client_from_cli(cli: &Cli) -> Result<ApiClient, ClientError> {
    let site = cli.site.clone().ok_or(ClientError::MissingSite)?;
    let session = SessionStore::load(cli.session_file.clone()).await?;
    ApiClient::new(&site, session)
}

#[cfg(test)]
mod tests;
