//! Core domain + application logic for the booru relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the remote
//! catalogs live behind ports (traits) implemented in adapter crates.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod entry;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod recipe;
pub mod select;

pub use errors::{Error, Result};
