//! Table definitions
//!
//! Every statement is idempotent (`IF NOT EXISTS`) so the schema can be
//! applied on every startup. Timestamps are RFC 3339 TEXT in UTC, ids are
//! UUID v4 TEXT, enum columns hold the snake_case names from `domain`.

use crate::Result;
use sqlx::SqlitePool;

/// (table name, CREATE statement) in dependency order
pub const TABLES: &[(&str, &str)] = &[
    (
        "settings",
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "profiles",
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            stage_name TEXT,
            phone TEXT,
            timezone TEXT,
            password_hash TEXT,
            is_test_data INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "user_roles",
        r#"
        CREATE TABLE IF NOT EXISTS user_roles (
            user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            granted_by TEXT,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, role)
        )
        "#,
    ),
    (
        "sessions",
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            revoked_at TEXT
        )
        "#,
    ),
    (
        "invitation_tokens",
        r#"
        CREATE TABLE IF NOT EXISTS invitation_tokens (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            token_hash TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            used_at TEXT,
            revoked_at TEXT
        )
        "#,
    ),
    (
        "creator_applications",
        r#"
        CREATE TABLE IF NOT EXISTS creator_applications (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL,
            stage_name TEXT,
            instagram_handle TEXT,
            tiktok_handle TEXT,
            onlyfans_handle TEXT,
            follower_count INTEGER,
            message TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            rejection_reason TEXT,
            reviewed_by TEXT,
            reviewed_at TEXT,
            user_id TEXT REFERENCES profiles(id) ON DELETE SET NULL,
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "creator_access_levels",
        r#"
        CREATE TABLE IF NOT EXISTS creator_access_levels (
            user_id TEXT PRIMARY KEY REFERENCES profiles(id) ON DELETE CASCADE,
            access_level TEXT NOT NULL DEFAULT 'no_access',
            updated_by TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "access_level_audit_log",
        r#"
        CREATE TABLE IF NOT EXISTS access_level_audit_log (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            previous_level TEXT,
            new_level TEXT NOT NULL,
            changed_by TEXT,
            reason TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "manager_availability",
        r#"
        CREATE TABLE IF NOT EXISTS manager_availability (
            id TEXT PRIMARY KEY,
            manager_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            starts_at TEXT NOT NULL,
            ends_at TEXT NOT NULL,
            is_booked INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "creator_meetings",
        r#"
        CREATE TABLE IF NOT EXISTS creator_meetings (
            id TEXT PRIMARY KEY,
            creator_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            manager_id TEXT REFERENCES profiles(id) ON DELETE SET NULL,
            slot_id TEXT REFERENCES manager_availability(id) ON DELETE SET NULL,
            scheduled_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'scheduled',
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "onboarding_responses",
        r#"
        CREATE TABLE IF NOT EXISTS onboarding_responses (
            user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            step TEXT NOT NULL,
            answers TEXT NOT NULL DEFAULT '{}',
            completed INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, step)
        )
        "#,
    ),
    (
        "creator_contracts",
        r#"
        CREATE TABLE IF NOT EXISTS creator_contracts (
            id TEXT PRIMARY KEY,
            creator_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            terms TEXT NOT NULL,
            revenue_share_percent INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'draft',
            pdf_key TEXT,
            signature_name TEXT,
            sent_at TEXT,
            signed_at TEXT,
            voided_at TEXT,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "invoices",
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id TEXT PRIMARY KEY,
            invoice_number TEXT NOT NULL UNIQUE,
            creator_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            period_start TEXT NOT NULL,
            period_end TEXT NOT NULL,
            due_date TEXT NOT NULL,
            items TEXT NOT NULL DEFAULT '[]',
            subtotal_cents INTEGER NOT NULL,
            agency_fee_cents INTEGER NOT NULL,
            total_cents INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'draft',
            paid_at TEXT,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "content_uploads",
        r#"
        CREATE TABLE IF NOT EXISTS content_uploads (
            id TEXT PRIMARY KEY,
            creator_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            file_name TEXT NOT NULL,
            storage_key TEXT NOT NULL,
            content_type TEXT,
            size_bytes INTEGER NOT NULL,
            caption TEXT,
            status TEXT NOT NULL DEFAULT 'pending_review',
            feedback TEXT,
            reviewed_by TEXT,
            reviewed_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "support_tickets",
        r#"
        CREATE TABLE IF NOT EXISTS support_tickets (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            subject TEXT NOT NULL,
            body TEXT NOT NULL,
            priority TEXT NOT NULL DEFAULT 'normal',
            status TEXT NOT NULL DEFAULT 'open',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "notification_history",
        r#"
        CREATE TABLE IF NOT EXISTS notification_history (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            read_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "email_logs",
        r#"
        CREATE TABLE IF NOT EXISTS email_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT REFERENCES profiles(id) ON DELETE SET NULL,
            kind TEXT NOT NULL,
            recipient TEXT NOT NULL,
            subject TEXT NOT NULL,
            html_body TEXT NOT NULL,
            text_body TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            max_retries INTEGER NOT NULL DEFAULT 3,
            last_error TEXT,
            provider_message_id TEXT,
            last_attempt_at TEXT,
            sent_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "permissions",
        r#"
        CREATE TABLE IF NOT EXISTS permissions (
            name TEXT PRIMARY KEY,
            description TEXT NOT NULL
        )
        "#,
    ),
    (
        "role_permissions",
        r#"
        CREATE TABLE IF NOT EXISTS role_permissions (
            role TEXT NOT NULL,
            permission TEXT NOT NULL REFERENCES permissions(name) ON DELETE CASCADE,
            PRIMARY KEY (role, permission)
        )
        "#,
    ),
    (
        "team_notes",
        r#"
        CREATE TABLE IF NOT EXISTS team_notes (
            id TEXT PRIMARY KEY,
            team TEXT NOT NULL,
            author_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            pinned INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "ppv_scripts",
        r#"
        CREATE TABLE IF NOT EXISTS ppv_scripts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            price_cents INTEGER NOT NULL,
            creator_id TEXT REFERENCES profiles(id) ON DELETE SET NULL,
            author_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
];

/// Secondary indexes for the common lookups
const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_applications_email ON creator_applications(email)",
    "CREATE INDEX IF NOT EXISTS idx_applications_status ON creator_applications(status)",
    "CREATE INDEX IF NOT EXISTS idx_audit_user ON access_level_audit_log(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_availability_manager ON manager_availability(manager_id, starts_at)",
    "CREATE INDEX IF NOT EXISTS idx_meetings_creator ON creator_meetings(creator_id)",
    "CREATE INDEX IF NOT EXISTS idx_contracts_creator ON creator_contracts(creator_id)",
    "CREATE INDEX IF NOT EXISTS idx_invoices_creator ON invoices(creator_id)",
    "CREATE INDEX IF NOT EXISTS idx_uploads_creator ON content_uploads(creator_id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notification_history(user_id, read_at)",
    "CREATE INDEX IF NOT EXISTS idx_email_logs_status ON email_logs(status, retry_count)",
    "CREATE INDEX IF NOT EXISTS idx_team_notes_team ON team_notes(team)",
];

/// Names of every table the services require
pub fn table_names() -> Vec<&'static str> {
    TABLES.iter().map(|(name, _)| *name).collect()
}

/// Create every table and index (idempotent)
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    for (_, ddl) in TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }
    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

/// Tables from `table_names()` that are missing in the database
pub async fn missing_tables(pool: &SqlitePool) -> Result<Vec<String>> {
    let existing: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;

    Ok(table_names()
        .into_iter()
        .filter(|name| !existing.iter().any(|e| e == name))
        .map(str::to_string)
        .collect())
}
