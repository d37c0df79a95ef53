//! Domain enums shared by the database layer and the HTTP API
//!
//! Every enum is stored as snake_case TEXT and serialized the same way in
//! JSON, so the database value and the wire value are identical.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Implements `as_str`, `Display` and `FromStr` from a variant/string table
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Database / wire representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::InvalidInput(format!(
                        "Unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// User role
///
/// A user may hold several roles; the highest ranked one decides where the
/// user lands after signing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Manager,
    Chatter,
    Marketer,
    Studio,
    Creator,
}

text_enum!(Role {
    SuperAdmin => "super_admin",
    Admin => "admin",
    Manager => "manager",
    Chatter => "chatter",
    Marketer => "marketer",
    Studio => "studio",
    Creator => "creator",
});

impl Role {
    /// Precedence when a user holds several roles (higher wins)
    pub fn rank(&self) -> u8 {
        match self {
            Role::SuperAdmin => 100,
            Role::Admin => 90,
            Role::Manager => 70,
            Role::Chatter | Role::Marketer | Role::Studio => 50,
            Role::Creator => 10,
        }
    }

    /// Whether this role belongs to the agency staff (everything except creators)
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Creator)
    }

    /// Team dashboard this role works on, if any
    pub fn team(&self) -> Option<Team> {
        match self {
            Role::Chatter => Some(Team::Chat),
            Role::Marketer => Some(Team::Marketing),
            Role::Studio => Some(Team::Studio),
            _ => None,
        }
    }

    /// Highest ranked role of a set
    pub fn highest(roles: &[Role]) -> Option<Role> {
        roles.iter().copied().max_by_key(Role::rank)
    }
}

/// Creator access level gating dashboard features
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AccessLevel {
    NoAccess,
    MeetingOnly,
    FullAccess,
}

text_enum!(AccessLevel {
    NoAccess => "no_access",
    MeetingOnly => "meeting_only",
    FullAccess => "full_access",
});

impl Default for AccessLevel {
    fn default() -> Self {
        AccessLevel::NoAccess
    }
}

/// Team dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Team {
    Chat,
    Marketing,
    Studio,
}

text_enum!(Team {
    Chat => "chat",
    Marketing => "marketing",
    Studio => "studio",
});

impl Team {
    /// Role whose holders are members of this team
    pub fn member_role(&self) -> Role {
        match self {
            Team::Chat => Role::Chatter,
            Team::Marketing => Role::Marketer,
            Team::Studio => Role::Studio,
        }
    }
}

/// Creator application review state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(ApplicationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// Onboarding meeting state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MeetingStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

text_enum!(MeetingStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

/// Contract lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Sent,
    Signed,
    Voided,
}

text_enum!(ContractStatus {
    Draft => "draft",
    Sent => "sent",
    Signed => "signed",
    Voided => "voided",
});

impl ContractStatus {
    /// Allowed lifecycle moves: draft→sent|voided, sent→signed|voided
    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        matches!(
            (self, next),
            (ContractStatus::Draft, ContractStatus::Sent)
                | (ContractStatus::Draft, ContractStatus::Voided)
                | (ContractStatus::Sent, ContractStatus::Signed)
                | (ContractStatus::Sent, ContractStatus::Voided)
        )
    }

    pub fn ensure_transition(&self, next: ContractStatus) -> crate::Result<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(Error::illegal_transition("Contract", self, next))
        }
    }
}

/// Invoice state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

text_enum!(InvoiceStatus {
    Draft => "draft",
    Sent => "sent",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled",
});

impl InvoiceStatus {
    /// Paid and cancelled invoices are final
    pub fn is_final(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

/// Outbound email delivery state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

text_enum!(EmailStatus {
    Pending => "pending",
    Sent => "sent",
    Failed => "failed",
});

/// Support ticket state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

text_enum!(TicketStatus {
    Open => "open",
    InProgress => "in_progress",
    Resolved => "resolved",
    Closed => "closed",
});

/// Support ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Normal,
    High,
    Urgent,
}

text_enum!(TicketPriority {
    Low => "low",
    Normal => "normal",
    High => "high",
    Urgent => "urgent",
});

impl Default for TicketPriority {
    fn default() -> Self {
        TicketPriority::Normal
    }
}

/// Review state of an uploaded content file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UploadStatus {
    PendingReview,
    Approved,
    Rejected,
}

text_enum!(UploadStatus {
    PendingReview => "pending_review",
    Approved => "approved",
    Rejected => "rejected",
});

/// Permission names seeded into the `permissions` table
pub mod permissions {
    use super::Role;

    pub const APPLICATIONS_REVIEW: &str = "applications.review";
    pub const ACCESS_GRANT: &str = "access.grant";
    pub const AVAILABILITY_MANAGE: &str = "availability.manage";
    pub const MEETINGS_MANAGE: &str = "meetings.manage";
    pub const CONTRACTS_MANAGE: &str = "contracts.manage";
    pub const INVOICES_MANAGE: &str = "invoices.manage";
    pub const CONTENT_REVIEW: &str = "content.review";
    pub const SUPPORT_MANAGE: &str = "support.manage";
    pub const TEAM_NOTES_WRITE: &str = "team_notes.write";
    pub const PPV_SCRIPTS_WRITE: &str = "ppv_scripts.write";
    pub const PROFILES_VIEW_ALL: &str = "profiles.view_all";

    /// (name, description) of every known permission
    pub const ALL: &[(&str, &str)] = &[
        (APPLICATIONS_REVIEW, "Review and decide creator applications"),
        (ACCESS_GRANT, "Change creator access levels"),
        (AVAILABILITY_MANAGE, "Publish meeting availability"),
        (MEETINGS_MANAGE, "Update onboarding meeting outcomes"),
        (CONTRACTS_MANAGE, "Draft, send and void contracts"),
        (INVOICES_MANAGE, "Create invoices and record payments"),
        (CONTENT_REVIEW, "Approve or reject uploaded content"),
        (SUPPORT_MANAGE, "Work on support tickets"),
        (TEAM_NOTES_WRITE, "Write team dashboard notes"),
        (PPV_SCRIPTS_WRITE, "Write pay-per-view scripts"),
        (PROFILES_VIEW_ALL, "List every profile"),
    ];

    /// Default grants applied when the database is created
    pub fn default_grants(role: Role) -> &'static [&'static str] {
        match role {
            Role::SuperAdmin | Role::Admin => &[
                APPLICATIONS_REVIEW,
                ACCESS_GRANT,
                AVAILABILITY_MANAGE,
                MEETINGS_MANAGE,
                CONTRACTS_MANAGE,
                INVOICES_MANAGE,
                CONTENT_REVIEW,
                SUPPORT_MANAGE,
                TEAM_NOTES_WRITE,
                PPV_SCRIPTS_WRITE,
                PROFILES_VIEW_ALL,
            ],
            Role::Manager => &[
                APPLICATIONS_REVIEW,
                ACCESS_GRANT,
                AVAILABILITY_MANAGE,
                MEETINGS_MANAGE,
                CONTRACTS_MANAGE,
                INVOICES_MANAGE,
                CONTENT_REVIEW,
                SUPPORT_MANAGE,
                TEAM_NOTES_WRITE,
                PROFILES_VIEW_ALL,
            ],
            Role::Chatter => &[TEAM_NOTES_WRITE, PPV_SCRIPTS_WRITE],
            Role::Marketer => &[TEAM_NOTES_WRITE],
            Role::Studio => &[TEAM_NOTES_WRITE, CONTENT_REVIEW],
            Role::Creator => &[],
        }
    }
}
