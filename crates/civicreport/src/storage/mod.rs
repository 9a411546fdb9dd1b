//! Local backend for civicreport.
//!
//! This module provides a `SQLite`-backed [`RecordStore`] ([`IssueDatabase`])
//! and a filesystem [`ObjectStore`](crate::store::ObjectStore)
//! ([`LocalObjectStore`]), so the workflow can run without any hosted
//! service.

pub mod migrations;
mod objects;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::issue::{Department, PersistedIssue, PersistedIssueInput};
use crate::store::{RecordStore, StoreError, ISSUES_TABLE};

pub use objects::LocalObjectStore;

const SELECT_COLUMNS: &str = "id, user_id, title, description, department, location_name, \
     latitude, longitude, media_urls, created_at";

/// `SQLite` storage for issue records.
///
/// The connection sits behind a mutex so the database can be shared with
/// the async submission workflow.
#[derive(Debug)]
pub struct IssueDatabase {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl IssueDatabase {
    /// Open or create an issue database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening issue database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Issue database ready at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database, for tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("issue database mutex poisoned"))
    }

    /// Store a new issue and return it with its assigned id and timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, record: &PersistedIssueInput) -> Result<PersistedIssue> {
        let issue = PersistedIssue {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            record: record.clone(),
        };
        let media_urls = serde_json::to_string(&record.media_urls)?;

        self.conn()?.execute(
            r"
            INSERT INTO issues (id, user_id, title, description, department, location_name,
                                latitude, longitude, media_urls, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                issue.id,
                record.user_id,
                record.title,
                record.description,
                record.department.slug(),
                record.location_name,
                record.latitude,
                record.longitude,
                media_urls,
                issue.created_at.to_rfc3339(),
            ],
        )?;

        debug!("Inserted issue {}", issue.id);
        Ok(issue)
    }

    /// Get an issue by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: &str) -> Result<Option<PersistedIssue>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM issues WHERE id = ?1");
        let issue = self
            .conn()?
            .query_row(&sql, [id], Self::row_to_issue)
            .optional()?;
        Ok(issue)
    }

    /// The most recent issues, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<PersistedIssue>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM issues ORDER BY created_at DESC LIMIT ?1");
        self.query(&sql, params![limit_param(limit)])
    }

    /// The most recent issues routed to `department`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_by_department(
        &self,
        department: Department,
        limit: usize,
    ) -> Result<Vec<PersistedIssue>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM issues WHERE department = ?1 \
             ORDER BY created_at DESC LIMIT ?2"
        );
        self.query(&sql, params![department.slug(), limit_param(limit)])
    }

    /// The most recent issues reported by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<PersistedIssue>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM issues WHERE user_id = ?1 \
             ORDER BY created_at DESC LIMIT ?2"
        );
        self.query(&sql, params![user_id, limit_param(limit)])
    }

    fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<PersistedIssue>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let issues = stmt
            .query_map(params, Self::row_to_issue)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(issues)
    }

    /// Count stored issues.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<IssueStats> {
        let total_issues = self.count()?;
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT department, COUNT(*) FROM issues GROUP BY department ORDER BY department",
        )?;
        let by_department = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let newest: Option<String> = conn
            .query_row(
                "SELECT created_at FROM issues ORDER BY created_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let newest_issue = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(IssueStats {
            total_issues,
            by_department,
            newest_issue,
            db_size_bytes,
        })
    }

    /// Convert a database row to a [`PersistedIssue`].
    fn row_to_issue(row: &rusqlite::Row) -> rusqlite::Result<PersistedIssue> {
        let id: String = row.get(0)?;
        let department_slug: String = row.get(4)?;
        let media_json: String = row.get(8)?;
        let created_at_str: String = row.get(9)?;

        let department = Department::from_slug(&department_slug).unwrap_or_else(|| {
            warn!("Unknown department '{department_slug}' on issue {id}, reading as other");
            Department::Other
        });
        let media_urls = serde_json::from_str(&media_json).unwrap_or_else(|e| {
            warn!("Malformed media_urls on issue {id}: {e}");
            Vec::new()
        });
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

        Ok(PersistedIssue {
            id,
            created_at,
            record: PersistedIssueInput {
                user_id: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                department,
                location_name: row.get(5)?,
                latitude: row.get(6)?,
                longitude: row.get(7)?,
                media_urls,
            },
        })
    }
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl RecordStore for IssueDatabase {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(
        &self,
        table: &str,
        record: &PersistedIssueInput,
    ) -> std::result::Result<(), StoreError> {
        if table != ISSUES_TABLE {
            return Err(StoreError::UnknownTable(table.to_string()));
        }
        IssueDatabase::insert(self, record)?;
        Ok(())
    }
}

/// Statistics about the issue database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueStats {
    /// Total number of issues stored.
    pub total_issues: i64,
    /// Issue counts per department slug, sorted by slug.
    pub by_department: Vec<(String, i64)>,
    /// Timestamp of the newest issue.
    pub newest_issue: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> IssueDatabase {
        IssueDatabase::open_in_memory().expect("failed to create test database")
    }

    fn record(title: &str, department: Department, user_id: &str) -> PersistedIssueInput {
        PersistedIssueInput {
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: format!("{title} details"),
            department,
            location_name: "MG Road, Sector 5".to_string(),
            latitude: 12.9716,
            longitude: 77.5946,
            media_urls: vec![
                "file:///media/issue-media/u/1-0.jpg".to_string(),
                "file:///media/issue-media/u/1-1.mp4".to_string(),
            ],
        }
    }

    #[test]
    fn test_open_in_memory() {
        assert!(IssueDatabase::open_in_memory().is_ok());
    }

    #[test]
    fn test_insert_and_get() {
        let db = create_test_db();
        let input = record("Street light not working", Department::Electricity, "u1");

        let stored = db.insert(&input).unwrap();
        assert!(Uuid::parse_str(&stored.id).is_ok());

        let fetched = db.get(&stored.id).unwrap().unwrap();
        assert_eq!(fetched.record, input);
        assert_eq!(fetched.id, stored.id);
    }

    #[test]
    fn test_media_urls_keep_order() {
        let db = create_test_db();
        let mut input = record("Overflowing drain", Department::Sanitation, "u1");
        input.media_urls = vec!["c".to_string(), "a".to_string(), "b".to_string()];

        let stored = db.insert(&input).unwrap();
        let fetched = db.get(&stored.id).unwrap().unwrap();
        assert_eq!(fetched.record.media_urls, ["c", "a", "b"]);
    }

    #[test]
    fn test_department_stored_as_slug() {
        let db = create_test_db();
        let stored = db
            .insert(&record("Pothole", Department::RoadsTransport, "u1"))
            .unwrap();

        let slug: String = db
            .conn()
            .unwrap()
            .query_row(
                "SELECT department FROM issues WHERE id = ?1",
                [&stored.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(slug, "roads-&-transport");
    }

    #[test]
    fn test_get_nonexistent() {
        let db = create_test_db();
        assert!(db.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_recent() {
        let db = create_test_db();
        for i in 0..5 {
            db.insert(&record(&format!("Issue {i}"), Department::Other, "u1"))
                .unwrap();
        }

        assert_eq!(db.list_recent(3).unwrap().len(), 3);
        assert_eq!(db.list_recent(10).unwrap().len(), 5);
        assert!(db.list_recent(0).unwrap().is_empty());
    }

    #[test]
    fn test_list_by_department() {
        let db = create_test_db();
        db.insert(&record("Leak", Department::WaterSupply, "u1"))
            .unwrap();
        db.insert(&record("Outage", Department::Electricity, "u1"))
            .unwrap();
        db.insert(&record("Low pressure", Department::WaterSupply, "u2"))
            .unwrap();

        let water = db.list_by_department(Department::WaterSupply, 10).unwrap();
        assert_eq!(water.len(), 2);
        assert!(water
            .iter()
            .all(|i| i.record.department == Department::WaterSupply));
        assert!(db
            .list_by_department(Department::PublicSafety, 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_list_by_user() {
        let db = create_test_db();
        db.insert(&record("A", Department::Other, "alice")).unwrap();
        db.insert(&record("B", Department::Other, "bob")).unwrap();

        let mine = db.list_by_user("alice", 10).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].record.title, "A");
    }

    #[test]
    fn test_count_and_stats() {
        let db = create_test_db();
        let stats = db.stats().unwrap();
        assert_eq!(stats.total_issues, 0);
        assert!(stats.newest_issue.is_none());

        db.insert(&record("A", Department::Sanitation, "u")).unwrap();
        db.insert(&record("B", Department::Sanitation, "u")).unwrap();
        db.insert(&record("C", Department::Electricity, "u")).unwrap();

        assert_eq!(db.count().unwrap(), 3);
        let stats = db.stats().unwrap();
        assert_eq!(stats.total_issues, 3);
        assert_eq!(
            stats.by_department,
            vec![
                ("electricity".to_string(), 1),
                ("sanitation".to_string(), 2)
            ]
        );
        assert!(stats.newest_issue.is_some());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_unicode_content() {
        let db = create_test_db();
        let input = record("पार्क की सफाई के बारे में", Department::ParksRecreation, "u");
        let stored = db.insert(&input).unwrap();
        let fetched = db.get(&stored.id).unwrap().unwrap();
        assert_eq!(fetched.record.title, "पार्क की सफाई के बारे में");
    }

    #[test]
    fn test_open_file_based_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/issues.db");

        let db = IssueDatabase::open(&path).unwrap();
        db.insert(&record("A", Department::Other, "u")).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), path);
        assert!(db.stats().unwrap().db_size_bytes > 0);
    }

    #[test]
    fn test_reopen_keeps_issues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.db");

        let id = {
            let db = IssueDatabase::open(&path).unwrap();
            db.insert(&record("Persisted", Department::Other, "u"))
                .unwrap()
                .id
        };

        let db = IssueDatabase::open(&path).unwrap();
        assert_eq!(db.get(&id).unwrap().unwrap().record.title, "Persisted");
    }

    #[tokio::test]
    async fn test_record_store_insert() {
        let db = create_test_db();
        let input = record("Via trait", Department::PublicSafety, "u");

        RecordStore::insert(&db, ISSUES_TABLE, &input).await.unwrap();
        assert_eq!(db.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_store_rejects_unknown_table() {
        let db = create_test_db();
        let input = record("Nope", Department::Other, "u");

        let err = RecordStore::insert(&db, "users", &input).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownTable(_)));
        assert_eq!(db.count().unwrap(), 0);
    }
}
