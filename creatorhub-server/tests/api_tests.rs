//! Integration tests for creatorhub-server API endpoints
//!
//! Tests cover:
//! - Health endpoint (no auth required) and session middleware
//! - Sign-in, role based redirects, route guards, sign-out
//! - Application intake, approval and invitation redemption
//! - Access grants, onboarding progress, meeting booking
//! - Contract lifecycle, invoice totals and overdue listing
//! - Content upload limits, support tickets
//! - Team dashboard permissions

mod helpers;

use axum::http::{Method, StatusCode};
use chrono::{Datelike, Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use creatorhub_common::credentials::hash_password;
use creatorhub_common::{AccessLevel, Role};
use creatorhub_server::db;
use helpers::{FlakyMailer, TestApp};

fn future_slot(days: i64, hour: u32) -> Value {
    let start = (Utc::now() + Duration::days(days))
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
        .and_utc();
    json!({
        "starts_at": start.to_rfc3339(),
        "ends_at": (start + Duration::minutes(30)).to_rfc3339(),
    })
}

fn application(email: &str) -> Value {
    json!({
        "full_name": "Jane Doe",
        "email": email,
        "instagram_handle": "@jane",
        "follower_count": 5000,
        "age_confirmed": true,
    })
}

// =============================================================================
// Health and Authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "creatorhub-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(Method::GET, "/api/profiles/me", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = app
        .request(Method::GET, "/api/profiles/me", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_in_and_redirect_by_role() {
    let app = TestApp::new().await;
    let (manager_id, _) = app.manager().await;
    let hash = hash_password("Manag3rPass").unwrap();
    db::profiles::set_password_hash(&app.state.db, &manager_id, &hash)
        .await
        .unwrap();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/sign-in",
            None,
            Some(json!({"email": "manager@hub.test", "password": "wrong-pass1"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/sign-in",
            None,
            Some(json!({"email": " Manager@Hub.test ", "password": "Manag3rPass"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect_to"], "/manager");
    assert_eq!(body["roles"], json!(["manager"]));
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(Method::GET, "/api/profiles/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "manager@hub.test");
}

#[tokio::test]
async fn test_redirect_and_route_guards_for_creators() {
    let app = TestApp::new().await;
    let (_, pending) = app
        .creator("pending@hub.test", "Pat Pending", AccessLevel::NoAccess)
        .await;
    let (_, meeting) = app
        .creator("meeting@hub.test", "Mia Meeting", AccessLevel::MeetingOnly)
        .await;
    let (_, full) = app
        .creator("full@hub.test", "Fay Full", AccessLevel::FullAccess)
        .await;

    let (_, body) = app
        .request(Method::GET, "/api/auth/redirect", Some(&pending), None)
        .await;
    assert_eq!(body["redirect_to"], "/pending-approval");

    let (_, body) = app
        .request(
            Method::GET,
            "/api/auth/redirect?path=/creator/dashboard",
            Some(&meeting),
            None,
        )
        .await;
    assert_eq!(body["redirect_to"], "/meeting");
    assert_eq!(body["allowed"], false);

    let (_, body) = app
        .request(
            Method::GET,
            "/api/auth/redirect?path=/admin",
            Some(&full),
            None,
        )
        .await;
    assert_eq!(body["redirect_to"], "/onboarding");
    assert_eq!(body["allowed"], false);
}

#[tokio::test]
async fn test_sign_out_revokes_session() {
    let app = TestApp::new().await;
    let (_, token) = app.admin().await;

    let (status, body) = app
        .request(Method::POST, "/api/auth/sign-out", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signed_out"], true);

    let (status, _) = app
        .request(Method::GET, "/api/auth/session", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Applications and Approval
// =============================================================================

#[tokio::test]
async fn test_application_validation_and_duplicates() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/applications",
            None,
            Some(json!({"full_name": "Jane", "email": "bad"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("email"));
    assert!(message.contains("age_confirmed"));

    let (status, body) = app
        .request(
            Method::POST,
            "/api/applications",
            None,
            Some(application("Jane@Example.com")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["email"], "jane@example.com");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/applications",
            None,
            Some(application("jane@example.com")),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_applications_list_requires_reviewer() {
    let app = TestApp::new().await;
    let (_, chatter) = app
        .user("chat@hub.test", "Cal Chatter", &[Role::Chatter])
        .await;
    let (_, manager) = app.manager().await;
    app.request(
        Method::POST,
        "/api/applications",
        None,
        Some(application("jane@example.com")),
    )
    .await;

    let (status, _) = app
        .request(Method::GET, "/api/applications", Some(&chatter), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::GET,
            "/api/applications?status=pending",
            Some(&manager),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_approval_invitation_flow() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;

    let (_, submitted) = app
        .request(
            Method::POST,
            "/api/applications",
            None,
            Some(application("jane@example.com")),
        )
        .await;
    let application_id = submitted["id"].as_str().unwrap().to_string();

    let (status, outcome) = app
        .request(
            Method::POST,
            "/functions/v1/approve-application",
            Some(&manager),
            Some(json!({"application_id": application_id})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["user_created"], true);
    assert_eq!(outcome["access_level"], "meeting_only");
    assert_eq!(outcome["email"]["delivered"], true);

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/v1/approve-application",
            Some(&manager),
            Some(json!({"application_id": application_id})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let token = app
        .invitation_token("jane@example.com")
        .expect("Invitation email should carry a token");
    assert_eq!(token.len(), 64);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/accept-invitation",
            None,
            Some(json!({"token": token, "password": "short"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, session) = app
        .request(
            Method::POST,
            "/api/auth/accept-invitation",
            None,
            Some(json!({"token": token, "password": "Cre4torPass"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["redirect_to"], "/meeting");
    assert_eq!(session["roles"], json!(["creator"]));

    // Single use
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/accept-invitation",
            None,
            Some(json!({"token": token, "password": "Cre4torPass"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reject_application_emails_applicant() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (_, submitted) = app
        .request(
            Method::POST,
            "/api/applications",
            None,
            Some(application("jane@example.com")),
        )
        .await;
    let id = submitted["id"].as_str().unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/applications/{}/reject", id),
            Some(&manager),
            Some(json!({"reason": "Not a fit right now"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application"]["status"], "rejected");
    assert_eq!(body["email"]["delivered"], true);

    let sent = app.mailer.as_ref().unwrap().sent();
    assert!(sent.iter().any(|e| e.to == "jane@example.com"));
}

// =============================================================================
// Access and Onboarding
// =============================================================================

#[tokio::test]
async fn test_access_grant_is_audited() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (creator_id, creator) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::MeetingOnly)
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/access/grant",
            Some(&creator),
            Some(json!({"user_id": creator_id, "access_level": "full_access"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);

    let (status, outcome) = app
        .request(
            Method::POST,
            "/api/access/grant",
            Some(&manager),
            Some(json!({
                "user_id": creator_id,
                "access_level": "full_access",
                "reason": "Meeting went well",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["previous_level"], "meeting_only");
    assert_eq!(outcome["new_level"], "full_access");
    assert!(outcome["audit_id"].is_string());

    let (_, audit) = app
        .request(
            Method::GET,
            &format!("/api/access/audit?user_id={}", creator_id),
            Some(&manager),
            None,
        )
        .await;
    let rows = audit.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["new_level"], "full_access");

    let (_, level) = app
        .request(
            Method::GET,
            &format!("/api/access/{}", creator_id),
            Some(&creator),
            None,
        )
        .await;
    assert_eq!(level["access_level"], "full_access");
}

#[tokio::test]
async fn test_access_grant_rejects_non_creators() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (chatter_id, _) = app
        .user("chat@hub.test", "Cal Chatter", &[Role::Chatter])
        .await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/access/grant",
            Some(&manager),
            Some(json!({"user_id": chatter_id, "access_level": "full_access"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Book a fresh slot as `creator`; returns the meeting id
async fn booked_meeting(app: &TestApp, manager: &str, creator: &str, days: i64) -> String {
    let (_, slot) = app
        .request(
            Method::POST,
            "/api/availability",
            Some(manager),
            Some(future_slot(days, 14)),
        )
        .await;
    let (status, booking) = app
        .request(
            Method::POST,
            &format!("/api/availability/{}/book", slot["id"].as_str().unwrap()),
            Some(creator),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    booking["meeting"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_access_grant_completes_the_onboarding_meeting() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (jane_id, jane) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::MeetingOnly)
        .await;
    let (other_id, other) = app
        .creator("other@example.com", "Other Creator", AccessLevel::MeetingOnly)
        .await;
    let jane_meeting = booked_meeting(&app, &manager, &jane, 2).await;
    let other_meeting = booked_meeting(&app, &manager, &other, 3).await;

    let (status, outcome) = app
        .request(
            Method::POST,
            "/api/access/grant",
            Some(&manager),
            Some(json!({
                "user_id": jane_id,
                "access_level": "full_access",
                "meeting_id": jane_meeting,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["meeting_completed"], true);
    assert_eq!(outcome["warnings"], json!([]));

    // Someone else's meeting is left alone
    let (status, outcome) = app
        .request(
            Method::POST,
            "/api/access/grant",
            Some(&manager),
            Some(json!({
                "user_id": other_id,
                "access_level": "full_access",
                "meeting_id": jane_meeting,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["meeting_completed"], false);
    assert_eq!(outcome["warnings"].as_array().unwrap().len(), 1);

    let (_, meetings) = app
        .request(Method::GET, "/api/meetings", Some(&manager), None)
        .await;
    let status_of = |id: &str| {
        meetings
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["id"] == id)
            .map(|m| m["status"].clone())
            .unwrap()
    };
    assert_eq!(status_of(&jane_meeting), "completed");
    assert_eq!(status_of(&other_meeting), "scheduled");

    let (_, progress) = app
        .request(Method::GET, "/api/onboarding/progress", Some(&jane), None)
        .await;
    assert_eq!(progress["meeting_completed"], true);
}

#[tokio::test]
async fn test_access_grant_survives_meeting_and_email_failures() {
    let mailer = Arc::new(FlakyMailer::default());
    let app = TestApp::with_mailer(mailer.clone()).await;
    let (_, manager) = app.manager().await;
    let (creator_id, creator) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::MeetingOnly)
        .await;

    let (status, outcome) = app
        .request(
            Method::POST,
            "/api/access/grant",
            Some(&manager),
            Some(json!({
                "user_id": creator_id,
                "access_level": "full_access",
                "meeting_id": "no-such-meeting",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["new_level"], "full_access");
    assert_eq!(outcome["meeting_completed"], false);
    assert!(outcome["audit_id"].is_string());
    assert_eq!(outcome["email"]["delivered"], false);
    let warnings: Vec<&str> = outcome["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w.as_str().unwrap())
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("no-such-meeting"));
    assert!(warnings[1].contains("connection refused"));

    let (_, level) = app
        .request(
            Method::GET,
            &format!("/api/access/{}", creator_id),
            Some(&creator),
            None,
        )
        .await;
    assert_eq!(level["access_level"], "full_access");
}

#[tokio::test]
async fn test_onboarding_progress_follows_saved_steps() {
    let app = TestApp::new().await;
    let (_, creator) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/onboarding/steps/favourite_colour",
            Some(&creator),
            Some(json!({"answers": {}})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, before) = app
        .request(Method::GET, "/api/onboarding/progress", Some(&creator), None)
        .await;
    assert_eq!(before["full_access_granted"], true);
    assert_eq!(before["questionnaire_completed"], false);

    for step in creatorhub_server::services::onboarding::STEPS {
        let (status, _) = app
            .request(
                Method::PUT,
                &format!("/api/onboarding/steps/{}", step),
                Some(&creator),
                Some(json!({"answers": {"note": "done"}, "completed": true})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, after) = app
        .request(Method::GET, "/api/onboarding/progress", Some(&creator), None)
        .await;
    assert_eq!(after["questionnaire_completed"], true);
    assert!(after["steps"]
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["completed"] == true));

    let (_, redirect) = app
        .request(Method::GET, "/api/auth/redirect", Some(&creator), None)
        .await;
    assert_eq!(redirect["redirect_to"], "/creator/dashboard");
}

// =============================================================================
// Availability and Meetings
// =============================================================================

#[tokio::test]
async fn test_slot_booking_is_exclusive_and_cancel_frees_it() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (_, first) = app
        .creator("first@hub.test", "First Creator", AccessLevel::MeetingOnly)
        .await;
    let (_, second) = app
        .creator("second@hub.test", "Second Creator", AccessLevel::MeetingOnly)
        .await;

    let (status, slot) = app
        .request(
            Method::POST,
            "/api/availability",
            Some(&manager),
            Some(future_slot(2, 10)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let slot_id = slot["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/availability",
            Some(&manager),
            Some(future_slot(2, 10)),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let book = format!("/api/availability/{}/book", slot_id);
    let (status, booking) = app.request(Method::POST, &book, Some(&first), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["meeting"]["status"], "scheduled");
    let meeting_id = booking["meeting"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.request(Method::POST, &book, Some(&second), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/meetings/{}/status", meeting_id),
            Some(&manager),
            Some(json!({"status": "cancelled"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.request(Method::POST, &book, Some(&second), None).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_recancelling_a_meeting_keeps_the_new_booking() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (_, first) = app
        .creator("first@hub.test", "First Creator", AccessLevel::MeetingOnly)
        .await;
    let (_, second) = app
        .creator("second@hub.test", "Second Creator", AccessLevel::MeetingOnly)
        .await;
    let (_, third) = app
        .creator("third@hub.test", "Third Creator", AccessLevel::MeetingOnly)
        .await;

    let (_, slot) = app
        .request(
            Method::POST,
            "/api/availability",
            Some(&manager),
            Some(future_slot(3, 9)),
        )
        .await;
    let book = format!("/api/availability/{}/book", slot["id"].as_str().unwrap());

    let (_, booking) = app.request(Method::POST, &book, Some(&first), None).await;
    let first_status = format!(
        "/api/meetings/{}/status",
        booking["meeting"]["id"].as_str().unwrap()
    );
    let cancel = json!({"status": "cancelled"});
    let (status, _) = app
        .request(Method::POST, &first_status, Some(&manager), Some(cancel.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.request(Method::POST, &book, Some(&second), None).await;
    assert_eq!(status, StatusCode::CREATED);

    // Stale meeting: status rewrite only, the slot stays with the second creator
    let (status, body) = app
        .request(Method::POST, &first_status, Some(&manager), Some(cancel))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, _) = app.request(Method::POST, &book, Some(&third), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request(
            Method::POST,
            &first_status,
            Some(&manager),
            Some(json!({"status": "scheduled"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_weekly_template_skips_overlapping_slots() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let day = (Utc::now() + Duration::days(3)).date_naive();
    let weekday = (day.weekday().num_days_from_monday() + 1).to_string();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/availability",
            Some(&manager),
            Some(future_slot(3, 10)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let template = json!({
        "weekday": weekday,
        "start_time": "10:00",
        "end_time": "11:00",
        "slot_minutes": 30,
        "weeks": 2,
    });
    let (status, body) = app
        .request(
            Method::POST,
            "/api/availability/weekly",
            Some(&manager),
            Some(template.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 3);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["slots"].as_array().unwrap().len(), 3);

    // Re-running the same template creates nothing new
    let (_, body) = app
        .request(
            Method::POST,
            "/api/availability/weekly",
            Some(&manager),
            Some(template),
        )
        .await;
    assert_eq!(body["created"], 0);
    assert_eq!(body["skipped"], 4);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/availability/weekly",
            Some(&manager),
            Some(json!({
                "weekday": "someday",
                "start_time": "10:00",
                "end_time": "11:00",
                "slot_minutes": 30,
                "weeks": 1,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_past_slots_are_rejected() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/availability",
            Some(&manager),
            Some(future_slot(-2, 10)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Contracts and Invoices
// =============================================================================

async fn draft_contract(app: &TestApp, manager: &str, creator_id: &str, share: i64) -> String {
    let (status, contract) = app
        .request(
            Method::POST,
            "/api/contracts",
            Some(manager),
            Some(json!({
                "creator_id": creator_id,
                "title": "Management agreement",
                "terms": "Standard terms",
                "revenue_share_percent": share,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(contract["status"], "draft");
    contract["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_contract_lifecycle() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (_, admin) = app.admin().await;
    let (creator_id, creator) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;
    let id = draft_contract(&app, &manager, &creator_id, 30).await;

    // Drafts cannot be signed
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/contracts/{}/sign", id),
            Some(&creator),
            Some(json!({"signature_name": "Jane Doe"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, sent) = app
        .request(
            Method::POST,
            &format!("/api/contracts/{}/send", id),
            Some(&manager),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["contract"]["status"], "sent");

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/contracts/{}/sign", id),
            Some(&creator),
            Some(json!({"signature_name": "Someone Else"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, signed) = app
        .request(
            Method::POST,
            &format!("/api/contracts/{}/sign", id),
            Some(&creator),
            Some(json!({"signature_name": "  jane doe "})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(signed["contract"]["status"], "signed");

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/contracts/{}/void", id),
            Some(&manager),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Signed contracts are final
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/contracts/{}/void", id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_creators_only_see_their_own_contracts() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (jane_id, _) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;
    let (_, other) = app
        .creator("other@example.com", "Other Creator", AccessLevel::FullAccess)
        .await;
    let id = draft_contract(&app, &manager, &jane_id, 20).await;

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/contracts/{}", id),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app
        .request(Method::GET, "/api/contracts", Some(&other), None)
        .await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_contract_pdf_roundtrip() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (creator_id, creator) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;
    let id = draft_contract(&app, &manager, &creator_id, 20).await;
    let pdf = b"%PDF-1.4 test".to_vec();

    let (status, _, _) = app
        .request_raw(
            Method::PUT,
            &format!("/api/contracts/{}/pdf", id),
            &manager,
            "text/plain",
            pdf.clone(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = app
        .request_raw(
            Method::PUT,
            &format!("/api/contracts/{}/pdf", id),
            &manager,
            "application/pdf",
            pdf.clone(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, content_type, bytes) = app
        .request_raw(
            Method::GET,
            &format!("/api/contracts/{}/pdf", id),
            &creator,
            "application/json",
            Vec::new(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/pdf"));
    assert_eq!(bytes, pdf);
}

#[tokio::test]
async fn test_pdf_replacement_survives_failed_cleanup() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (creator_id, _) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;
    let id = draft_contract(&app, &manager, &creator_id, 20).await;
    // A key the storage layer refuses to resolve, so removing it fails
    db::contracts::set_pdf_key(&app.state.db, &id, "../outside.pdf")
        .await
        .unwrap();

    let (status, _, body) = app
        .request_raw(
            Method::PUT,
            &format!("/api/contracts/{}/pdf", id),
            &manager,
            "application/pdf",
            b"%PDF-1.4 second".to_vec(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let contract: Value = serde_json::from_slice(&body).unwrap();
    let key = contract["pdf_key"].as_str().unwrap();
    assert!(key.starts_with(&creator_id));
    assert!(key.ends_with(".pdf"));
}

#[tokio::test]
async fn test_invoice_totals_use_signed_contract_share() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (creator_id, creator) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;
    let items = json!([
        {"description": "Subscriptions", "quantity": 1, "unit_amount_cents": 100000},
        {"description": "Tips", "quantity": 2, "unit_amount_cents": 50000},
    ]);
    let body = json!({
        "creator_id": creator_id,
        "period_start": "2026-09-01",
        "period_end": "2026-09-30",
        "items": items,
    });

    // No signed contract: no agency fee
    let (status, invoice) = app
        .request(Method::POST, "/api/invoices", Some(&manager), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invoice["subtotal_cents"], 200000);
    assert_eq!(invoice["agency_fee_cents"], 0);
    assert_eq!(invoice["due_date"], "2026-10-14");

    let contract = draft_contract(&app, &manager, &creator_id, 30).await;
    app.request(
        Method::POST,
        &format!("/api/contracts/{}/send", contract),
        Some(&manager),
        None,
    )
    .await;
    app.request(
        Method::POST,
        &format!("/api/contracts/{}/sign", contract),
        Some(&creator),
        Some(json!({"signature_name": "Jane Doe"})),
    )
    .await;

    let (status, invoice) = app
        .request(Method::POST, "/api/invoices", Some(&manager), Some(body))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invoice["agency_fee_cents"], 60000);
    assert_eq!(invoice["total_cents"], 140000);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/invoices",
            Some(&creator),
            Some(json!({
                "creator_id": creator_id,
                "period_start": "2026-09-01",
                "period_end": "2026-09-30",
                "items": [],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, mine) = app
        .request(Method::GET, "/api/invoices", Some(&creator), None)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_invoice_due_date_out_of_range_is_rejected() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (creator_id, _) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;
    let items = json!([{"description": "Tips", "quantity": 1, "unit_amount_cents": 1000}]);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/invoices",
            Some(&manager),
            Some(json!({
                "creator_id": creator_id,
                "period_start": "2026-09-01",
                "period_end": "+262142-12-31",
                "items": items,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    app.set_setting("invoice_payment_terms_days", "9223372036854775807")
        .await;
    let (status, _) = app
        .request(
            Method::POST,
            "/api/invoices",
            Some(&manager),
            Some(json!({
                "creator_id": creator_id,
                "period_start": "2026-09-01",
                "period_end": "2026-09-30",
                "items": items,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sent_invoice_past_due_lists_as_overdue() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (creator_id, creator) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;
    let items = json!([{"description": "Tips", "quantity": 1, "unit_amount_cents": 1000}]);

    let (status, late) = app
        .request(
            Method::POST,
            "/api/invoices",
            Some(&manager),
            Some(json!({
                "creator_id": creator_id,
                "period_start": "2020-01-01",
                "period_end": "2020-01-31",
                "due_date": "2020-02-14",
                "items": items,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(late["status"], "draft");
    let late_id = late["id"].as_str().unwrap().to_string();

    // Same dates but never sent: a draft is not overdue
    app.request(
        Method::POST,
        "/api/invoices",
        Some(&manager),
        Some(json!({
            "creator_id": creator_id,
            "period_start": "2020-01-01",
            "period_end": "2020-01-31",
            "due_date": "2020-02-14",
            "items": items,
        })),
    )
    .await;

    let (status, sent) = app
        .request(
            Method::POST,
            &format!("/api/invoices/{}/status", late_id),
            Some(&manager),
            Some(json!({"status": "sent"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["status"], "overdue");

    let (_, overdue) = app
        .request(
            Method::GET,
            "/api/invoices?status=overdue",
            Some(&creator),
            None,
        )
        .await;
    let overdue = overdue.as_array().unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0]["id"], late_id.as_str());

    let (_, still_sent) = app
        .request(Method::GET, "/api/invoices?status=sent", Some(&manager), None)
        .await;
    assert!(still_sent.as_array().unwrap().is_empty());

    // Paying clears it
    let (status, paid) = app
        .request(
            Method::POST,
            &format!("/api/invoices/{}/status", late_id),
            Some(&manager),
            Some(json!({"status": "paid"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert!(paid["paid_at"].is_string());

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/invoices/{}/status", late_id),
            Some(&manager),
            Some(json!({"status": "sent"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// =============================================================================
// Content
// =============================================================================

#[tokio::test]
async fn test_content_upload_limit_and_review() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (_, creator) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;
    let (_, meeting_only) = app
        .creator("new@example.com", "New Creator", AccessLevel::MeetingOnly)
        .await;
    app.set_setting("content_max_upload_bytes", "16").await;

    let (status, _, _) = app
        .request_raw(
            Method::POST,
            "/api/content?file_name=clip.mp4",
            &meeting_only,
            "video/mp4",
            vec![1; 8],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app
        .request_raw(
            Method::POST,
            "/api/content?file_name=clip.mp4",
            &creator,
            "video/mp4",
            vec![1; 64],
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _, body) = app
        .request_raw(
            Method::POST,
            "/api/content?file_name=../clip.mp4&caption=First",
            &creator,
            "video/mp4",
            vec![1; 8],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let upload: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(upload["status"], "pending_review");
    assert!(!upload["file_name"].as_str().unwrap().contains('/'));
    let id = upload["id"].as_str().unwrap();

    let (status, reviewed) = app
        .request(
            Method::POST,
            &format!("/api/content/{}/review", id),
            Some(&manager),
            Some(json!({"status": "approved"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "approved");

    let (_, notifications) = app
        .request(
            Method::GET,
            "/api/notifications?unread_only=true",
            Some(&creator),
            None,
        )
        .await;
    assert!(!notifications.as_array().unwrap().is_empty());
}

// =============================================================================
// Support
// =============================================================================

#[tokio::test]
async fn test_support_tickets_lifecycle() {
    let app = TestApp::new().await;
    let (_, manager) = app.manager().await;
    let (_, jane) = app
        .creator("jane@example.com", "Jane Doe", AccessLevel::FullAccess)
        .await;
    let (_, other) = app
        .creator("other@example.com", "Other Creator", AccessLevel::FullAccess)
        .await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/support",
            Some(&jane),
            Some(json!({"subject": "  ", "body": "Help"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, ticket) = app
        .request(
            Method::POST,
            "/api/support",
            Some(&jane),
            Some(json!({
                "subject": "Payout missing",
                "body": "September payout",
                "priority": "high",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["status"], "open");
    assert_eq!(ticket["priority"], "high");
    let id = ticket["id"].as_str().unwrap().to_string();

    let (_, defaulted) = app
        .request(
            Method::POST,
            "/api/support",
            Some(&other),
            Some(json!({"subject": "Login", "body": "Cannot sign in"})),
        )
        .await;
    assert_eq!(defaulted["priority"], "normal");

    let (_, mine) = app
        .request(Method::GET, "/api/support", Some(&jane), None)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (_, all) = app
        .request(Method::GET, "/api/support", Some(&manager), None)
        .await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let status_uri = format!("/api/support/{}/status", id);
    let (status, _) = app
        .request(
            Method::POST,
            &status_uri,
            Some(&jane),
            Some(json!({"status": "resolved"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .request(
            Method::POST,
            &status_uri,
            Some(&manager),
            Some(json!({"status": "in_progress"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "in_progress");

    let (_, notifications) = app
        .request(Method::GET, "/api/notifications", Some(&jane), None)
        .await;
    assert!(notifications
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["title"] == "Support ticket updated"));

    let (status, _) = app
        .request(
            Method::POST,
            "/api/support/missing/status",
            Some(&manager),
            Some(json!({"status": "closed"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Team
// =============================================================================

#[tokio::test]
async fn test_team_notes_respect_membership() {
    let app = TestApp::new().await;
    let (_, chatter) = app
        .user("chat@hub.test", "Cal Chatter", &[Role::Chatter])
        .await;
    let (_, marketer) = app
        .user("market@hub.test", "Mo Marketer", &[Role::Marketer])
        .await;
    let note = json!({"title": "Tonight", "body": "Push the bundle", "pinned": true});

    let (status, _) = app
        .request(
            Method::POST,
            "/api/team/chat/notes",
            Some(&marketer),
            Some(note.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/team/chat/notes",
            Some(&chatter),
            Some(note),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(Method::GET, "/api/team/unknown/notes", Some(&chatter), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, dashboard) = app
        .request(Method::GET, "/api/team/chat/dashboard", Some(&chatter), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["pinned_notes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_scripts_live_on_chat_team_only() {
    let app = TestApp::new().await;
    let (_, chatter) = app
        .user("chat@hub.test", "Cal Chatter", &[Role::Chatter])
        .await;
    let (_, marketer) = app
        .user("market@hub.test", "Mo Marketer", &[Role::Marketer])
        .await;
    let script = json!({"title": "Weekend", "body": "Hey you", "price_cents": 1500});

    let (status, _) = app
        .request(
            Method::POST,
            "/api/team/chat/scripts",
            Some(&chatter),
            Some(json!({"title": "Bad", "body": "x", "price_cents": -1})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/team/chat/scripts",
            Some(&chatter),
            Some(script.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/team/marketing/scripts",
            Some(&marketer),
            Some(script),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
