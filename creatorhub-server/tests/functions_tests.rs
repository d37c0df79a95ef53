//! Integration tests for `/functions/v1/*` and the admin endpoints
//!
//! Tests cover:
//! - Account creation, deletion guards and invitation resends
//! - Failed email retry with backoff
//! - Test data switch and smoke test
//! - Role assignment and the permission matrix

mod helpers;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use creatorhub_common::{time, AccessLevel, Role};
use helpers::{FlakyMailer, TestApp};

// =============================================================================
// create-account / resend-invitation
// =============================================================================

#[tokio::test]
async fn test_create_account_invites_staff() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;

    let (status, outcome) = app
        .request(
            Method::POST,
            "/functions/v1/create-account",
            Some(&admin),
            Some(json!({"email": "Chat@Hub.test", "full_name": "Cal Chatter", "role": "chatter"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["role"], "chatter");
    assert_eq!(outcome["email"]["delivered"], true);
    assert!(app.invitation_token("chat@hub.test").is_some());

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/create-account",
            Some(&admin),
            Some(json!({"email": "chat@hub.test", "full_name": "Again", "role": "chatter"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/create-account",
            Some(&admin),
            Some(json!({"email": "c@hub.test", "full_name": "Creator", "role": "creator"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Only a super admin creates admins
    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/create-account",
            Some(&admin),
            Some(json!({"email": "a2@hub.test", "full_name": "Second", "role": "admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_resend_invitation_replaces_token() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;
    let (_, outcome) = app
        .request(
            Method::POST,
            "/functions/v1/create-account",
            Some(&admin),
            Some(json!({"email": "mk@hub.test", "full_name": "Mo Marketer", "role": "marketer"})),
        )
        .await;
    let user_id = outcome["user_id"].as_str().unwrap().to_string();
    let first = app.invitation_token("mk@hub.test").unwrap();

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/resend-invitation",
            Some(&admin),
            Some(json!({"user_id": user_id})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = app.invitation_token("mk@hub.test").unwrap();
    assert_ne!(first, second);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/accept-invitation",
            None,
            Some(json!({"token": first, "password": "Mark3terPass"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, session) = app
        .request(
            Method::POST,
            "/api/auth/accept-invitation",
            None,
            Some(json!({"token": second, "password": "Mark3terPass"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["redirect_to"], "/team/marketing");

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/resend-invitation",
            Some(&admin),
            Some(json!({"user_id": user_id})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// =============================================================================
// delete-account
// =============================================================================

#[tokio::test]
async fn test_delete_account_guards() {
    let app = TestApp::new().await;
    let (admin_id, admin) = app.admin().await;
    let (super_id, _) = app
        .user("root@hub.test", "Root User", &[Role::SuperAdmin])
        .await;

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/delete-account",
            Some(&admin),
            Some(json!({"user_id": admin_id, "confirm_email": "admin@hub.test"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/delete-account",
            Some(&admin),
            Some(json!({"user_id": super_id, "confirm_email": "wrong@hub.test"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/delete-account",
            Some(&admin),
            Some(json!({"user_id": super_id, "confirm_email": "root@hub.test"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_account_removes_user_and_files() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;
    let (creator_id, creator) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;

    let (status, _, _) = app
        .request_raw(
            Method::POST,
            "/api/content?file_name=clip.mp4",
            &creator,
            "video/mp4",
            vec![7; 32],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, outcome) = app
        .request(
            Method::POST,
            "/functions/v1/delete-account",
            Some(&admin),
            Some(json!({"user_id": creator_id, "confirm_email": "JANE@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["deleted"], true);
    assert_eq!(outcome["files_removed"], 1);

    let (status, _) = app
        .request(Method::GET, "/api/profiles/me", Some(&creator), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, audit) = app
        .request(
            Method::GET,
            &format!("/api/access/audit?user_id={}", creator_id),
            Some(&admin),
            None,
        )
        .await;
    let rows = audit.as_array().unwrap();
    assert_eq!(rows[0]["new_level"], "no_access");
}

// =============================================================================
// retry-failed-emails
// =============================================================================

#[tokio::test]
async fn test_retry_failed_emails_respects_backoff() {
    let mailer = Arc::new(FlakyMailer::default());
    let app = TestApp::with_mailer(mailer.clone()).await;
    let (_, admin) = app.admin().await;

    let (status, outcome) = app
        .request(
            Method::POST,
            "/functions/v1/create-account",
            Some(&admin),
            Some(json!({"email": "st@hub.test", "full_name": "Sam Studio", "role": "studio"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "account survives a failed email");
    assert_eq!(outcome["email"]["delivered"], false);

    let (_, report) = app
        .request(
            Method::POST,
            "/functions/v1/retry-failed-emails",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(report["examined"], 1);
    assert_eq!(report["skipped_not_due"], 1);
    assert_eq!(report["retried"], 0);

    sqlx::query("UPDATE email_logs SET last_attempt_at = ?")
        .bind(time::now() - Duration::days(1))
        .execute(&app.state.db)
        .await
        .unwrap();
    mailer.healthy.store(true, Ordering::SeqCst);

    let (_, report) = app
        .request(
            Method::POST,
            "/functions/v1/retry-failed-emails",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(report["retried"], 1);
    assert_eq!(report["succeeded"], 1);

    let (_, logs) = app
        .request(
            Method::GET,
            "/api/admin/email-logs?status=sent",
            Some(&admin),
            None,
        )
        .await;
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["retry_count"], 1);
    assert_eq!(logs[0]["provider_message_id"], "flaky-ok");
}

#[tokio::test]
async fn test_retry_requires_admin() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/retry-failed-emails",
            Some(&manager),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =============================================================================
// create-test-data / smoke-test / send-contract-notification
// =============================================================================

#[tokio::test]
async fn test_create_test_data_is_switchable() {
    let disabled = TestApp::new().await;
    let (_, root) = disabled
        .user("root@hub.test", "Root User", &[Role::SuperAdmin])
        .await;
    let (status, _) = disabled
        .request(Method::POST, "/functions/v1/create-test-data", Some(&root), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let enabled = TestApp::with_test_data_enabled().await;
    let (_, root) = enabled
        .user("root@hub.test", "Root User", &[Role::SuperAdmin])
        .await;
    let (_, admin) = enabled.admin().await;
    let (status, _) = enabled
        .request(Method::POST, "/functions/v1/create-test-data", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, report) = enabled
        .request(Method::POST, "/functions/v1/create-test-data", Some(&root), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["slot_ids"].as_array().unwrap().len(), 2);

    let (_, profiles) = enabled
        .request(Method::GET, "/api/profiles", Some(&admin), None)
        .await;
    let demo = profiles
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == report["creator_id"])
        .expect("Demo creator should be listed");
    assert_eq!(demo["is_test_data"], true);
    assert_eq!(demo["access_level"], "full_access");
}

#[tokio::test]
async fn test_smoke_test_passes_on_fresh_install() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;

    let (status, report) = app
        .request(Method::POST, "/functions/v1/smoke-test", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["passed"], true, "{}", report);
    assert_eq!(report["checks"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_contract_notification_skips_drafts() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (creator_id, _) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;
    let (_, contract) = app
        .request(
            Method::POST,
            "/api/contracts",
            Some(&manager),
            Some(json!({
                "creator_id": creator_id,
                "title": "Agreement",
                "terms": "Terms",
                "revenue_share_percent": 25,
            })),
        )
        .await;
    let contract_id = contract["id"].as_str().unwrap();

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/send-contract-notification",
            Some(&manager),
            Some(json!({"contract_id": contract_id})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.request(
        Method::POST,
        &format!("/api/contracts/{}/send", contract_id),
        Some(&manager),
        None,
    )
    .await;
    let (status, body) = app
        .request(
            Method::POST,
            "/functions/v1/send-contract-notification",
            Some(&manager),
            Some(json!({"contract_id": contract_id})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"]["delivered"], true);

    let sent = app.mailer.as_ref().unwrap().sent();
    let last = sent.last().unwrap();
    assert!(last
        .text
        .contains(&format!("{}/creator/contracts/{}", helpers::BASE_URL, contract_id)));
}

// =============================================================================
// Admin: roles and permissions
// =============================================================================

#[tokio::test]
async fn test_role_changes_need_authority() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;
    let (root_id, root) = app
        .user("root@hub.test", "Root User", &[Role::SuperAdmin])
        .await;
    let (user_id, _) = app
        .user("chat@hub.test", "Cal Chatter", &[Role::Chatter])
        .await;

    let (status, roles) = app
        .request(
            Method::POST,
            "/api/admin/roles",
            Some(&admin),
            Some(json!({"user_id": user_id, "role": "studio"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roles["roles"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/admin/roles",
            Some(&admin),
            Some(json!({"user_id": user_id, "role": "admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::DELETE,
            "/api/admin/roles",
            Some(&root),
            Some(json!({"user_id": user_id, "role": "marketer"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            Method::DELETE,
            "/api/admin/roles",
            Some(&root),
            Some(json!({"user_id": root_id, "role": "super_admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_permission_matrix_changes_take_effect() {
    let app = TestApp::new().await;
    let (_, root) = app
        .user("root@hub.test", "Root User", &[Role::SuperAdmin])
        .await;
    let (_, marketer) = app
        .user("mk@hub.test", "Mo Marketer", &[Role::Marketer])
        .await;

    let (_, check) = app
        .request(
            Method::GET,
            "/api/admin/permissions/check?permission=team_notes.write",
            Some(&marketer),
            None,
        )
        .await;
    assert_eq!(check["granted"], true);

    let (status, change) = app
        .request(
            Method::POST,
            "/api/admin/permissions/revoke",
            Some(&root),
            Some(json!({"role": "marketer", "permission": "team_notes.write"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["changed"], true);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/team/marketing/notes",
            Some(&marketer),
            Some(json!({"title": "Plan", "body": "Reels"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/admin/permissions/grant",
            Some(&root),
            Some(json!({"role": "marketer", "permission": "does.not.exist"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
