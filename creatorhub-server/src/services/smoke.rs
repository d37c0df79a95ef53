//! Production smoke test

use serde::Serialize;
use tracing::{info, warn};

use creatorhub_common::db::missing_tables;

use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct SmokeCheck {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmokeReport {
    pub passed: bool,
    pub checks: Vec<SmokeCheck>,
}

fn check(name: &'static str, result: Result<String, String>) -> SmokeCheck {
    match result {
        Ok(detail) => SmokeCheck {
            name,
            passed: true,
            detail,
        },
        Err(detail) => SmokeCheck {
            name,
            passed: false,
            detail,
        },
    }
}

/// Run every check; a failing check never stops the others
pub async fn run_smoke_test(state: &AppState) -> SmokeReport {
    let database = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .map(|_| "connected".to_string())
        .map_err(|e| e.to_string());

    let tables = match missing_tables(&state.db).await {
        Ok(missing) if missing.is_empty() => Ok("all required tables present".to_string()),
        Ok(missing) => Err(format!("missing tables: {}", missing.join(", "))),
        Err(e) => Err(e.to_string()),
    };

    let storage = state
        .storage
        .check_writable()
        .await
        .map(|_| format!("{} is writable", state.storage.base().display()))
        .map_err(|e| e.to_string());

    let provider = state.mailer.provider();
    let email = match (&state.config.email.api_key, provider) {
        (Some(_), "log") => Err("API key configured but HTTP mailer unavailable".to_string()),
        (Some(_), provider) => Ok(format!("delivering via {}", provider)),
        (None, provider) => Ok(format!("no API key; using {} mailer", provider)),
    };

    let checks = vec![
        check("database", database),
        check("tables", tables),
        check("storage", storage),
        check("email", email),
    ];
    let passed = checks.iter().all(|c| c.passed);
    if passed {
        info!("Smoke test passed");
    } else {
        for failed in checks.iter().filter(|c| !c.passed) {
            warn!(check = failed.name, "Smoke check failed: {}", failed.detail);
        }
    }

    SmokeReport { passed, checks }
}
