//! Role-gated routing
//!
//! Decides where a signed-in user lands and which dashboard areas they may
//! open. The frontend asks `GET /api/auth/redirect` after every sign-in and
//! on every guarded navigation.

use creatorhub_common::{AccessLevel, Role};

pub const LOGIN: &str = "/login";
pub const ADMIN: &str = "/admin";
pub const MANAGER: &str = "/manager";
pub const TEAM_CHAT: &str = "/team/chat";
pub const TEAM_MARKETING: &str = "/team/marketing";
pub const TEAM_STUDIO: &str = "/team/studio";
pub const PENDING_APPROVAL: &str = "/pending-approval";
pub const MEETING: &str = "/meeting";
pub const ONBOARDING: &str = "/onboarding";
pub const CREATOR_DASHBOARD: &str = "/creator/dashboard";

/// Landing route for a user; the highest ranked role wins
pub fn home_route(
    roles: &[Role],
    access_level: AccessLevel,
    onboarding_complete: bool,
) -> &'static str {
    match Role::highest(roles) {
        None => LOGIN,
        Some(Role::SuperAdmin) | Some(Role::Admin) => ADMIN,
        Some(Role::Manager) => MANAGER,
        Some(Role::Chatter) => TEAM_CHAT,
        Some(Role::Marketer) => TEAM_MARKETING,
        Some(Role::Studio) => TEAM_STUDIO,
        Some(Role::Creator) => match access_level {
            AccessLevel::NoAccess => PENDING_APPROVAL,
            AccessLevel::MeetingOnly => MEETING,
            AccessLevel::FullAccess if !onboarding_complete => ONBOARDING,
            AccessLevel::FullAccess => CREATOR_DASHBOARD,
        },
    }
}

/// Whether `path` is reachable for the given roles and access level
///
/// Unguarded paths are always allowed. Admins may open every area.
pub fn route_allowed(path: &str, roles: &[Role], access_level: AccessLevel) -> bool {
    let has = |role: Role| roles.contains(&role);
    let is_admin = has(Role::SuperAdmin) || has(Role::Admin);

    if under(path, ADMIN) {
        return is_admin;
    }
    if under(path, MANAGER) {
        return is_admin || has(Role::Manager);
    }
    if under(path, TEAM_CHAT) {
        return is_admin || has(Role::Manager) || has(Role::Chatter);
    }
    if under(path, TEAM_MARKETING) {
        return is_admin || has(Role::Manager) || has(Role::Marketer);
    }
    if under(path, TEAM_STUDIO) {
        return is_admin || has(Role::Manager) || has(Role::Studio);
    }
    if under(path, "/creator") || under(path, ONBOARDING) {
        return has(Role::Creator) && access_level == AccessLevel::FullAccess;
    }
    if under(path, MEETING) {
        return has(Role::Creator) && access_level >= AccessLevel::MeetingOnly;
    }
    if under(path, PENDING_APPROVAL) {
        return has(Role::Creator);
    }
    true
}

/// `path` equals `prefix` or continues it with a `/`
fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}
