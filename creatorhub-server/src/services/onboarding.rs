//! Onboarding progress
//!
//! Progress is never stored. Every stage flag is derived from the rows
//! that prove it, so the flags move as soon as those rows change.

use serde::Serialize;
use sqlx::SqlitePool;

use creatorhub_common::domain::ApplicationStatus;
use creatorhub_common::AccessLevel;

use crate::db;

/// Questionnaire steps in display order
pub const STEPS: &[&str] = &[
    "personal_info",
    "content_preferences",
    "boundaries",
    "social_accounts",
    "payment_details",
];

pub fn is_known_step(step: &str) -> bool {
    STEPS.contains(&step)
}

/// Onboarding stages in the order a creator normally passes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ApplicationApproved,
    MeetingCompleted,
    FullAccessGranted,
    QuestionnaireCompleted,
    ContractSigned,
    FirstContentUploaded,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::ApplicationApproved,
        Stage::MeetingCompleted,
        Stage::FullAccessGranted,
        Stage::QuestionnaireCompleted,
        Stage::ContractSigned,
        Stage::FirstContentUploaded,
    ];
}

/// Raw facts the stage flags are computed from
#[derive(Debug, Clone, Default)]
pub struct StageFacts {
    pub application_approved: bool,
    pub meeting_completed: bool,
    pub access_level: AccessLevel,
    /// Steps whose response is marked completed
    pub completed_steps: Vec<String>,
    pub contract_signed: bool,
    pub uploads: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepState {
    pub step: &'static str,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingProgress {
    pub application_approved: bool,
    pub meeting_completed: bool,
    pub full_access_granted: bool,
    pub questionnaire_completed: bool,
    pub contract_signed: bool,
    pub first_content_uploaded: bool,
    pub steps: Vec<StepState>,
    pub completed_stages: u32,
    pub total_stages: u32,
    pub percent: u32,
    pub next_stage: Option<Stage>,
    pub is_complete: bool,
}

impl OnboardingProgress {
    pub fn from_facts(facts: &StageFacts) -> Self {
        let steps: Vec<StepState> = STEPS
            .iter()
            .map(|&step| StepState {
                step,
                completed: facts.completed_steps.iter().any(|s| s == step),
            })
            .collect();
        let questionnaire_completed = steps.iter().all(|s| s.completed);

        let flags = [
            (Stage::ApplicationApproved, facts.application_approved),
            (Stage::MeetingCompleted, facts.meeting_completed),
            (
                Stage::FullAccessGranted,
                facts.access_level == AccessLevel::FullAccess,
            ),
            (Stage::QuestionnaireCompleted, questionnaire_completed),
            (Stage::ContractSigned, facts.contract_signed),
            (Stage::FirstContentUploaded, facts.uploads > 0),
        ];

        let completed_stages = flags.iter().filter(|(_, done)| *done).count() as u32;
        let total_stages = Stage::ALL.len() as u32;
        let next_stage = flags.iter().find(|(_, done)| !done).map(|(stage, _)| *stage);

        Self {
            application_approved: flags[0].1,
            meeting_completed: flags[1].1,
            full_access_granted: flags[2].1,
            questionnaire_completed,
            contract_signed: flags[4].1,
            first_content_uploaded: flags[5].1,
            steps,
            completed_stages,
            total_stages,
            percent: completed_stages * 100 / total_stages,
            next_stage,
            is_complete: next_stage.is_none(),
        }
    }
}

/// Gather the facts for one user
pub async fn load_facts(db: &SqlitePool, user_id: &str) -> Result<StageFacts, sqlx::Error> {
    let application_approved = db::applications::latest_for_user(db, user_id)
        .await?
        .map(|app| app.status == ApplicationStatus::Approved)
        .unwrap_or(false);

    let completed_steps = db::onboarding::responses_for(db, user_id)
        .await?
        .into_iter()
        .filter(|r| r.completed)
        .map(|r| r.step)
        .collect();

    Ok(StageFacts {
        application_approved,
        meeting_completed: db::scheduling::has_completed_meeting(db, user_id).await?,
        access_level: db::access::effective_level(db, user_id).await?,
        completed_steps,
        contract_signed: db::contracts::latest_signed(db, user_id).await?.is_some(),
        uploads: db::content::count_uploads(db, Some(user_id), None).await?,
    })
}

pub async fn load_progress(
    db: &SqlitePool,
    user_id: &str,
) -> Result<OnboardingProgress, sqlx::Error> {
    Ok(OnboardingProgress::from_facts(&load_facts(db, user_id).await?))
}
