//! # Creator Hub Common Library
//!
//! Shared code for the Creator Hub services including:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Domain enums (roles, access levels, lifecycle statuses)
//! - Credential primitives (password hashing, opaque tokens)
//! - Database initialization and schema
//! - Time and backoff helpers

pub mod config;
pub mod credentials;
pub mod db;
pub mod domain;
pub mod error;
pub mod time;

pub use domain::{AccessLevel, Role};
pub use error::{Error, Result};
