//! Onboarding questionnaire responses

use chrono::{DateTime, Utc};
use creatorhub_common::time;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::SqlitePool;

/// One row of `onboarding_responses`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StepResponse {
    pub step: String,
    pub answers: Json<serde_json::Value>,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

pub async fn upsert_response(
    db: &SqlitePool,
    user_id: &str,
    step: &str,
    answers: &serde_json::Value,
    completed: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO onboarding_responses (user_id, step, answers, completed, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id, step) DO UPDATE SET
            answers = excluded.answers,
            completed = excluded.completed,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(step)
    .bind(Json(answers))
    .bind(completed)
    .bind(time::now())
    .execute(db)
    .await?;
    Ok(())
}

pub async fn responses_for(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<StepResponse>, sqlx::Error> {
    sqlx::query_as::<_, StepResponse>(
        r#"
        SELECT step, answers, completed, updated_at
        FROM onboarding_responses WHERE user_id = ?
        ORDER BY updated_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}
