//! Per-table database access
//!
//! Plain `sqlx` runtime queries. Functions that take a generic
//! `SqliteExecutor` are used inside transactions by multi-step workflows.

pub mod access;
pub mod applications;
pub mod content;
pub mod contracts;
pub mod invoices;
pub mod notifications;
pub mod onboarding;
pub mod permissions;
pub mod profiles;
pub mod scheduling;
pub mod sessions;
pub mod support;
pub mod team;
