//! `SQLite` schema definitions for the local issue database.

/// SQL statement to create the issues table.
///
/// `media_urls` holds a JSON array of strings in selection order.
pub const CREATE_ISSUES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    department TEXT NOT NULL,
    location_name TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    media_urls TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
)
";

/// Index for newest-first listings.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_issues_created_at ON issues(created_at DESC)
";

/// Index for filtering by department slug.
pub const CREATE_DEPARTMENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_issues_department ON issues(department)
";

/// Index for a user's own reports.
pub const CREATE_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_issues_user ON issues(user_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_ISSUES_TABLE,
    CREATE_CREATED_AT_INDEX,
    CREATE_DEPARTMENT_INDEX,
    CREATE_USER_INDEX,
    CREATE_METADATA_TABLE,
];
