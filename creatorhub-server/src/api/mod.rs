//! HTTP API handlers

pub mod access;
pub mod admin;
pub mod applications;
pub mod auth;
pub mod availability;
pub mod content;
pub mod contracts;
pub mod functions;
pub mod health;
pub mod invoices;
pub mod notifications;
pub mod onboarding;
pub mod profiles;
pub mod support;
pub mod team;

pub use access::access_routes;
pub use admin::admin_routes;
pub use applications::{application_routes, public_application_routes};
pub use auth::{auth_routes, public_auth_routes, session_middleware, CurrentUser};
pub use availability::{availability_routes, meeting_routes};
pub use content::content_routes;
pub use contracts::contract_routes;
pub use functions::function_routes;
pub use health::health_routes;
pub use invoices::invoice_routes;
pub use notifications::notification_routes;
pub use onboarding::onboarding_routes;
pub use profiles::profile_routes;
pub use support::support_routes;
pub use team::team_routes;

use std::str::FromStr;

use creatorhub_common::db::get_setting;

use crate::error::ApiResult;
use crate::AppState;

/// Read a numeric setting, falling back to `default` when absent or unparsable
pub(crate) async fn setting_or<T: FromStr>(
    state: &AppState,
    key: &str,
    default: T,
) -> ApiResult<T> {
    Ok(get_setting(&state.db, key)
        .await?
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default))
}
