//! Message bodies for workflow emails

use chrono::{DateTime, Utc};
use creatorhub_common::AccessLevel;

use super::OutboundEmail;

/// Escape text for inclusion in HTML
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Build a message from plain paragraphs
fn compose(to: &str, subject: String, paragraphs: &[String]) -> OutboundEmail {
    let html = paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>", escape(p)))
        .collect::<Vec<_>>()
        .join("\n");
    OutboundEmail {
        to: to.to_string(),
        subject,
        html,
        text: paragraphs.join("\n\n"),
    }
}

pub fn invitation(to: &str, name: &str, link: &str, expires_at: DateTime<Utc>) -> OutboundEmail {
    compose(
        to,
        "You're invited to Creator Hub".to_string(),
        &[
            format!("Hi {},", name),
            "Your Creator Hub account is ready. Set your password to sign in:".to_string(),
            link.to_string(),
            format!(
                "This link expires on {} UTC and can be used once.",
                expires_at.format("%Y-%m-%d %H:%M")
            ),
        ],
    )
}

pub fn access_granted(to: &str, name: &str, level: AccessLevel, link: &str) -> OutboundEmail {
    let detail = match level {
        AccessLevel::NoAccess => "Your dashboard access has been paused.",
        AccessLevel::MeetingOnly => "You can now book your onboarding meeting.",
        AccessLevel::FullAccess => "You now have full access to your creator dashboard.",
    };
    compose(
        to,
        "Your Creator Hub access was updated".to_string(),
        &[format!("Hi {},", name), detail.to_string(), link.to_string()],
    )
}

pub fn contract_sent(to: &str, name: &str, title: &str, link: &str) -> OutboundEmail {
    compose(
        to,
        format!("Contract ready for signature: {}", title),
        &[
            format!("Hi {},", name),
            format!("The contract \"{}\" is ready for you to review and sign.", title),
            link.to_string(),
        ],
    )
}

pub fn contract_signed(to: &str, name: &str, title: &str) -> OutboundEmail {
    compose(
        to,
        format!("Contract signed: {}", title),
        &[
            format!("Hi {},", name),
            format!("Thanks for signing \"{}\". A copy is available in your dashboard.", title),
        ],
    )
}

pub fn contract_voided(to: &str, name: &str, title: &str) -> OutboundEmail {
    compose(
        to,
        format!("Contract withdrawn: {}", title),
        &[
            format!("Hi {},", name),
            format!("The contract \"{}\" has been withdrawn by the agency.", title),
        ],
    )
}

pub fn application_rejected(to: &str, name: &str, reason: Option<&str>) -> OutboundEmail {
    let mut paragraphs = vec![
        format!("Hi {},", name),
        "Thank you for applying. We are unable to offer you a place at this time.".to_string(),
    ];
    if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
        paragraphs.push(format!("Feedback: {}", reason));
    }
    compose(to, "Your Creator Hub application".to_string(), &paragraphs)
}

pub fn meeting_scheduled(to: &str, name: &str, at: DateTime<Utc>) -> OutboundEmail {
    compose(
        to,
        "Your onboarding meeting is booked".to_string(),
        &[
            format!("Hi {},", name),
            format!(
                "Your onboarding meeting is scheduled for {} UTC.",
                at.format("%Y-%m-%d %H:%M")
            ),
        ],
    )
}
