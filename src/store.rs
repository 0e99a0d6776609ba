//! Persistent podcast and question metadata.
//!
//! Jobs live in the in-memory registry while they run; every committed stage
//! transition is mirrored here so metadata survives process restarts.
//! Question records are write-once.

use crate::error::{PodkastError, Result};
use crate::job::{JobStage, JobStatus, PodcastJob};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, instrument, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS podcasts (
    podcast_id TEXT PRIMARY KEY,
    document_ids TEXT NOT NULL,
    topic TEXT NOT NULL,
    target_duration_minutes INTEGER NOT NULL,
    status TEXT NOT NULL,
    stage TEXT NOT NULL,
    progress_percent INTEGER NOT NULL DEFAULT 0,
    script_path TEXT,
    audio_path TEXT,
    duration_seconds REAL,
    error TEXT,
    created_at TEXT NOT NULL,
    completed_at TEXT,
    failed_at TEXT
);

CREATE TABLE IF NOT EXISTS questions (
    id TEXT PRIMARY KEY,
    podcast_id TEXT NOT NULL,
    question_text TEXT NOT NULL,
    answer_text TEXT NOT NULL,
    timestamp REAL NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_questions_podcast_id ON questions(podcast_id);
"#;

/// A recorded listener question and its answer. Write-once.
#[derive(Debug, Clone)]
pub struct QuestionRecord {
    pub id: String,
    pub podcast_id: String,
    pub question_text: String,
    pub answer_text: String,
    pub timestamp: f64,
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed podcast metadata store.
pub struct PodcastStore {
    conn: Mutex<Connection>,
}

impl PodcastStore {
    /// Open (or create) the store at the given path.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized podcast store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PodkastError::JobState(format!("Store lock poisoned: {}", e)))
    }

    fn job_from_row(row: &Row<'_>) -> rusqlite::Result<PodcastJob> {
        let document_ids_json: String = row.get("document_ids")?;
        let status: String = row.get("status")?;
        let stage: String = row.get("stage")?;
        let created_at: String = row.get("created_at")?;
        let completed_at: Option<String> = row.get("completed_at")?;
        let failed_at: Option<String> = row.get("failed_at")?;

        Ok(PodcastJob {
            id: row.get("podcast_id")?,
            document_ids: serde_json::from_str(&document_ids_json).unwrap_or_default(),
            topic: row.get("topic")?,
            target_duration_minutes: row.get("target_duration_minutes")?,
            status: status.parse().unwrap_or(JobStatus::Failed),
            stage: stage.parse().unwrap_or(JobStage::Retrieving),
            progress_percent: row.get("progress_percent")?,
            script_path: row.get("script_path")?,
            audio_path: row.get("audio_path")?,
            duration_seconds: row.get("duration_seconds")?,
            error: row.get("error")?,
            created_at: created_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
            completed_at: completed_at.and_then(|s| s.parse().ok()),
            failed_at: failed_at.and_then(|s| s.parse().ok()),
        })
    }

    /// Save or update a podcast row.
    pub fn save_podcast(&self, job: &PodcastJob) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO podcasts (
                podcast_id, document_ids, topic, target_duration_minutes,
                status, stage, progress_percent,
                script_path, audio_path, duration_seconds, error,
                created_at, completed_at, failed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                job.id,
                serde_json::to_string(&job.document_ids)?,
                job.topic,
                job.target_duration_minutes,
                job.status.to_string(),
                job.stage.to_string(),
                job.progress_percent,
                job.script_path,
                job.audio_path,
                job.duration_seconds,
                job.error,
                job.created_at.to_rfc3339(),
                job.completed_at.map(|t| t.to_rfc3339()),
                job.failed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Retrieve a podcast row by id.
    pub fn get_podcast(&self, podcast_id: &str) -> Result<Option<PodcastJob>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM podcasts WHERE podcast_id = ?1")?;
        let mut rows = stmt.query_map(params![podcast_id], Self::job_from_row)?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// All podcast rows, newest first.
    pub fn list_podcasts(&self) -> Result<Vec<PodcastJob>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM podcasts ORDER BY created_at DESC")?;
        let rows = stmt.query_map([], Self::job_from_row)?;

        let mut podcasts = Vec::new();
        for row in rows {
            podcasts.push(row?);
        }
        Ok(podcasts)
    }

    /// Delete a podcast row. Artifact files are untouched; use
    /// [`cleanup_failed_podcast`](Self::cleanup_failed_podcast) for both.
    pub fn delete_podcast(&self, podcast_id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM podcasts WHERE podcast_id = ?1",
            params![podcast_id],
        )?;
        Ok(())
    }

    /// Remove partial artifacts and the row for a failed podcast.
    pub fn cleanup_failed_podcast(&self, podcast_id: &str, podcast_dir: &Path) -> Result<()> {
        let audio = crate::audio::audio_path(podcast_dir, podcast_id);
        if audio.exists() {
            if let Err(e) = std::fs::remove_file(&audio) {
                warn!("Failed to remove audio artifact {:?}: {}", audio, e);
            }
        }

        let script = crate::script::script_path(podcast_dir, podcast_id);
        if script.exists() {
            if let Err(e) = std::fs::remove_file(&script) {
                warn!("Failed to remove script artifact {:?}: {}", script, e);
            }
        }

        self.delete_podcast(podcast_id)
    }

    /// Record a question/answer pair. Write-once: replays are rejected.
    pub fn record_question(&self, record: &QuestionRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO questions (id, podcast_id, question_text, answer_text, timestamp, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.podcast_id,
                record.question_text,
                record.answer_text,
                record.timestamp,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All questions asked about a podcast, oldest first.
    pub fn questions_for(&self, podcast_id: &str) -> Result<Vec<QuestionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM questions WHERE podcast_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![podcast_id], |row| {
            let created_at: String = row.get("created_at")?;
            Ok(QuestionRecord {
                id: row.get("id")?,
                podcast_id: row.get("podcast_id")?,
                question_text: row.get("question_text")?,
                answer_text: row.get("answer_text")?,
                timestamp: row.get("timestamp")?,
                created_at: created_at
                    .parse::<DateTime<Utc>>()
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(row?);
        }
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::PodcastJob;

    #[test]
    fn test_podcast_round_trip() {
        let store = PodcastStore::open_in_memory().unwrap();

        let mut job = PodcastJob::new(
            "pod_1".to_string(),
            vec!["doc_1".to_string(), "doc_2".to_string()],
            "History".to_string(),
            3,
        );
        job.status = JobStatus::Complete;
        job.stage = JobStage::Done;
        job.progress_percent = 100;
        job.audio_path = Some("pod_1.mp3".to_string());
        job.duration_seconds = Some(176.0);
        job.completed_at = Some(Utc::now());

        store.save_podcast(&job).unwrap();

        let loaded = store.get_podcast("pod_1").unwrap().unwrap();
        assert_eq!(loaded.document_ids, job.document_ids);
        assert_eq!(loaded.status, JobStatus::Complete);
        assert_eq!(loaded.stage, JobStage::Done);
        assert_eq!(loaded.duration_seconds, Some(176.0));

        assert!(store.get_podcast("pod_missing").unwrap().is_none());
    }

    #[test]
    fn test_question_records_write_once() {
        let store = PodcastStore::open_in_memory().unwrap();

        let record = QuestionRecord {
            id: "q_1".to_string(),
            podcast_id: "pod_1".to_string(),
            question_text: "What is backpropagation?".to_string(),
            answer_text: "It's how networks learn.".to_string(),
            timestamp: 165.5,
            created_at: Utc::now(),
        };

        store.record_question(&record).unwrap();
        assert!(store.record_question(&record).is_err());

        let questions = store.questions_for("pod_1").unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].timestamp, 165.5);
    }

    #[test]
    fn test_cleanup_failed_podcast() {
        let store = PodcastStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let job = PodcastJob::new("pod_f".to_string(), vec![], "t".to_string(), 3);
        store.save_podcast(&job).unwrap();

        crate::audio::write_audio(dir.path(), "pod_f", &[0]).unwrap();
        store.cleanup_failed_podcast("pod_f", dir.path()).unwrap();

        assert!(store.get_podcast("pod_f").unwrap().is_none());
        assert!(!crate::audio::audio_path(dir.path(), "pod_f").exists());
    }
}
