//! Quire Core Library
//!
//! Local knowledge store engine for the Quire note-taking application.

pub mod config;
pub mod coordinator;
pub mod db;
pub mod diff;
pub mod error;
pub mod extract;
pub mod history;
pub mod logging;
