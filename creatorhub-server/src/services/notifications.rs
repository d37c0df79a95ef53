//! In-app notifications raised by workflows

use sqlx::SqlitePool;
use tracing::warn;

use crate::db;

/// Notification kinds written by workflows
pub mod kinds {
    pub const APPLICATION: &str = "application";
    pub const ACCESS: &str = "access";
    pub const MEETING: &str = "meeting";
    pub const CONTRACT: &str = "contract";
    pub const INVOICE: &str = "invoice";
    pub const CONTENT: &str = "content";
    pub const SUPPORT: &str = "support";
}

/// Record a notification for `user_id`
///
/// Failures are logged and swallowed; a missing notification never fails
/// the workflow that raised it. Returns the new row id on success.
pub async fn notify(
    db: &SqlitePool,
    user_id: &str,
    kind: &str,
    title: &str,
    body: &str,
) -> Option<String> {
    match db::notifications::insert_notification(db, user_id, kind, title, body).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(user_id, kind, "Failed to record notification: {}", e);
            None
        }
    }
}
