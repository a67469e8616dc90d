//! Moderated sharing service for stories, videos and shots.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
