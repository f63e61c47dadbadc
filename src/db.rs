use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

use crate::models::{Contact, Posting, StoredOpportunity};

/// Store failures the gate branches on. Conflict is the benign duplicate
/// race; everything else flips the run into fallback-log mode.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database unavailable: {0}")]
    Unavailable(String),
    #[error("opportunity with this identity hash already exists")]
    Conflict,
    #[error("database error: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open() -> Result<Self, StoreError> {
        let path = Self::default_path()?;
        Self::open_at(path)
    }

    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(&path)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { conn, path })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { conn, path: PathBuf::from(":memory:") })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> Result<PathBuf, StoreError> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "prospect") {
            Ok(proj_dirs.data_dir().join("prospect.db"))
        } else {
            Ok(PathBuf::from("prospect.db"))
        }
    }

    pub fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_hash TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                company_name TEXT NOT NULL,
                location TEXT NOT NULL DEFAULT '',
                description TEXT,
                url TEXT,
                source TEXT,
                match_score INTEGER,
                ai_analysis TEXT,
                contacts TEXT,
                status TEXT NOT NULL DEFAULT 'new' CHECK (status IN ('new', 'reviewing', 'applied', 'rejected', 'closed')),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_score ON jobs(match_score DESC);
            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            CREATE INDEX IF NOT EXISTS idx_jobs_created ON jobs(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(company_name);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='jobs'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'prospect init' first."));
        }
        Ok(())
    }

    /// Cross-run dedup check against the durable store.
    pub fn exists_by_hash(&self, hash: &str) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE job_hash = ?1",
            [hash],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert one scored opportunity with status 'new'. A UNIQUE violation
    /// on job_hash (a concurrent run got there first) maps to Conflict.
    pub fn insert_opportunity(
        &self,
        hash: &str,
        posting: &Posting,
        match_score: i64,
        ai_analysis: &str,
        contacts: &[Contact],
    ) -> Result<i64, StoreError> {
        let contacts_json = serde_json::to_string(contacts)?;

        let result = self.conn.execute(
            "INSERT INTO jobs (job_hash, title, company_name, location, description,
                               url, source, match_score, ai_analysis, contacts, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'new')",
            params![
                hash,
                posting.title,
                posting.company_name,
                posting.location,
                posting.description,
                posting.url,
                posting.source.as_str(),
                match_score,
                ai_analysis,
                contacts_json,
            ],
        );

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read surface for the outer layers: recent opportunities, optionally
    /// filtered by status and minimum score, best first.
    pub fn list_recent(
        &self,
        limit: usize,
        status: Option<&str>,
        min_score: Option<i64>,
    ) -> Result<Vec<StoredOpportunity>, StoreError> {
        let mut sql = String::from(
            "SELECT id, job_hash, title, company_name, location, description, url, source,
                    match_score, ai_analysis, contacts, status, created_at, updated_at
             FROM jobs WHERE 1=1",
        );

        let mut next = 1;
        if status.is_some() {
            sql.push_str(&format!(" AND status = ?{}", next));
            next += 1;
        }
        if min_score.is_some() {
            sql.push_str(&format!(" AND match_score >= ?{}", next));
            next += 1;
        }
        sql.push_str(&format!(
            " ORDER BY match_score DESC, created_at DESC LIMIT ?{}",
            next
        ));

        let limit = limit as i64;
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match (status, min_score) {
            (Some(s), Some(m)) => stmt.query_map(params![s, m, limit], Self::row_to_opportunity)?,
            (Some(s), None) => stmt.query_map(params![s, limit], Self::row_to_opportunity)?,
            (None, Some(m)) => stmt.query_map(params![m, limit], Self::row_to_opportunity)?,
            (None, None) => stmt.query_map(params![limit], Self::row_to_opportunity)?,
        };

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get(&self, id: i64) -> Result<Option<StoredOpportunity>, StoreError> {
        let result = self.conn.query_row(
            "SELECT id, job_hash, title, company_name, location, description, url, source,
                    match_score, ai_analysis, contacts, status, created_at, updated_at
             FROM jobs WHERE id = ?1",
            [id],
            Self::row_to_opportunity,
        );
        match result {
            Ok(opp) => Ok(Some(opp)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn row_to_opportunity(row: &rusqlite::Row) -> rusqlite::Result<StoredOpportunity> {
        let contacts_json: Option<String> = row.get(10)?;
        // Tolerate rows written before the contacts column had content.
        let contacts = contacts_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        Ok(StoredOpportunity {
            id: row.get(0)?,
            job_hash: row.get(1)?,
            title: row.get(2)?,
            company_name: row.get(3)?,
            location: row.get(4)?,
            description: row.get(5)?,
            url: row.get(6)?,
            source: row.get(7)?,
            match_score: row.get(8)?,
            ai_analysis: row.get(9)?,
            contacts,
            status: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

// --- Fallback log ---

/// One line of the fallback log: the full record that would have been a
/// database row, plus when it was captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackRecord {
    pub job_hash: String,
    pub posting: Posting,
    pub match_score: i64,
    pub ai_analysis: String,
    pub contacts: Vec<Contact>,
    pub recorded_at: String,
}

/// Append-only JSON-lines file used when the durable store is unreachable.
/// Entries here are never consulted for dedup; the log exists so a degraded
/// run still leaves an inspectable trail.
pub struct FallbackLog {
    path: PathBuf,
}

impl FallbackLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "prospect") {
            proj_dirs.data_dir().join("jobs_backup.jsonl")
        } else {
            PathBuf::from("jobs_backup.jsonl")
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn append(
        &self,
        hash: &str,
        posting: &Posting,
        match_score: i64,
        ai_analysis: &str,
        contacts: &[Contact],
    ) -> Result<()> {
        let record = FallbackRecord {
            job_hash: hash.to_string(),
            posting: posting.clone(),
            match_score,
            ai_analysis: ai_analysis.to_string(),
            contacts: contacts.to_vec(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open fallback log: {}", self.path.display()))?;

        let line = serde_json::to_string(&record)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<FallbackRecord>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read fallback log: {}", self.path.display()))?;
        let mut records = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }
}
