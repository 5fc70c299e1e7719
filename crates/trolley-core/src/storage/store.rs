use super::{schema, VoteStore};
use crate::errors::{StoreError, StoreResult};
use crate::model::{
    Choice, ModelRun, NewRun, NewVote, Problem, Provider, ReasoningEffort, RunStatus, ScoredVote,
    Vote,
};
use anyhow::Context;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite-backed store. A single connection serialized behind a mutex, shared by
/// every clone, so concurrent runs interleave at statement granularity.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

pub struct StoreStats {
    pub problems: u64,
    pub runs: u64,
    pub votes: u64,
    pub version: Option<String>,
}

const RUN_COLUMNS: &str = "id, model, display_name, reasoning_effort, status, total_problems, \
     completed_problems, alignment_score, provider_id, created_at";

const VOTE_COLUMNS: &str = "id, run_id, problem_id, choice, reasoning, principles_json, \
     assumptions, request_payload, audio_url, created_at";

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.lock();
        conn.execute_batch(schema::DDL)?;
        conn.pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // a panic while holding the lock leaves the connection itself usable
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn upsert_problem(&self, p: &Problem) -> StoreResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO problems(id, title, text, human_pull_votes, human_nothing_votes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                title=excluded.title,
                text=excluded.text,
                human_pull_votes=excluded.human_pull_votes,
                human_nothing_votes=excluded.human_nothing_votes",
            params![
                p.id,
                p.title,
                p.text,
                p.human_pull_votes as i64,
                p.human_nothing_votes as i64,
                now_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn upsert_provider(&self, p: &Provider) -> StoreResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO providers(id, name, voice_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name=excluded.name, voice_id=excluded.voice_id",
            params![p.id, p.name, p.voice_id],
        )?;
        Ok(())
    }

    /// Admin deletion. Votes go with the run.
    pub fn delete_run(&self, run_id: i64) -> StoreResult<bool> {
        let conn = self.lock();
        let n = conn.execute("DELETE FROM runs WHERE id=?1", params![run_id])?;
        Ok(n > 0)
    }

    pub fn count_votes(&self, run_id: i64) -> StoreResult<u64> {
        let conn = self.lock();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM votes WHERE run_id=?1",
            params![run_id],
            |r| r.get(0),
        )?;
        Ok(n as u64)
    }

    pub fn stats_best_effort(&self) -> StoreStats {
        let conn = self.lock();
        let count = |table: &str| -> u64 {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
                r.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .unwrap_or(0)
        };
        let version = conn
            .query_row("PRAGMA user_version", [], |r| r.get::<_, i64>(0))
            .ok()
            .map(|v| v.to_string());

        StoreStats {
            problems: count("problems"),
            runs: count("runs"),
            votes: count("votes"),
            version,
        }
    }

    fn run_exists(conn: &Connection, run_id: i64) -> StoreResult<bool> {
        Ok(conn
            .query_row("SELECT 1 FROM runs WHERE id=?1", params![run_id], |_| Ok(()))
            .optional()?
            .is_some())
    }

    fn update_run(
        conn: &Connection,
        run_id: i64,
        sql: &str,
        value: &dyn rusqlite::ToSql,
    ) -> StoreResult<()> {
        let n = conn.execute(sql, params![value, run_id])?;
        if n == 0 {
            return Err(StoreError::RunDeleted(run_id));
        }
        Ok(())
    }
}

impl VoteStore for Store {
    fn create_run(&self, run: &NewRun, total_problems: u64) -> StoreResult<ModelRun> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO runs(model, display_name, reasoning_effort, status, total_problems,
                              completed_problems, provider_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
            params![
                run.model,
                run.display_name,
                run.reasoning_effort.map(|e| e.as_str()),
                RunStatus::Running.as_str(),
                total_problems as i64,
                run.provider_id,
                now_rfc3339()
            ],
        )?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM runs WHERE id=?1", RUN_COLUMNS),
            params![id],
            run_from_row,
        )
        .map_err(Into::into)
    }

    fn get_run(&self, run_id: i64) -> StoreResult<Option<ModelRun>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id=?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?)
    }

    fn list_runs(&self, statuses: &[RunStatus]) -> StoreResult<Vec<ModelRun>> {
        let conn = self.lock();
        let sql = if statuses.is_empty() {
            format!("SELECT {} FROM runs ORDER BY id ASC", RUN_COLUMNS)
        } else {
            let marks = vec!["?"; statuses.len()].join(", ");
            format!(
                "SELECT {} FROM runs WHERE status IN ({}) ORDER BY id ASC",
                RUN_COLUMNS, marks
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let params = params_from_iter(statuses.iter().map(|s| s.as_str()));
        let rows = stmt.query_map(params, run_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn update_run_status(&self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        let conn = self.lock();
        Self::update_run(
            &conn,
            run_id,
            "UPDATE runs SET status=?1 WHERE id=?2",
            &status.as_str(),
        )
    }

    fn update_run_score(&self, run_id: i64, score: f64) -> StoreResult<()> {
        let conn = self.lock();
        Self::update_run(
            &conn,
            run_id,
            "UPDATE runs SET alignment_score=?1 WHERE id=?2",
            &score,
        )
    }

    fn increment_completed(&self, run_id: i64) -> StoreResult<()> {
        let conn = self.lock();
        Self::update_run(
            &conn,
            run_id,
            "UPDATE runs SET completed_problems = completed_problems + ?1 WHERE id=?2",
            &1i64,
        )
    }

    fn create_vote(&self, vote: &NewVote) -> StoreResult<Vote> {
        let conn = self.lock();
        let principles_json = serde_json::to_string(&vote.principles)?;

        let inserted = conn.execute(
            "INSERT INTO votes(run_id, problem_id, choice, reasoning, principles_json,
                               assumptions, request_payload, audio_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                vote.run_id,
                vote.problem_id,
                vote.choice.as_str(),
                vote.reasoning,
                principles_json,
                vote.assumptions,
                vote.request_payload,
                vote.audio_url,
                now_rfc3339()
            ],
        );

        if let Err(e) = inserted {
            return Err(match constraint_kind(&e) {
                Some(Constraint::Unique) => StoreError::Duplicate {
                    run_id: vote.run_id,
                    problem_id: vote.problem_id.clone(),
                },
                Some(Constraint::ForeignKey) => {
                    if Self::run_exists(&conn, vote.run_id)? {
                        StoreError::NotFound(format!("problem {}", vote.problem_id))
                    } else {
                        StoreError::RunDeleted(vote.run_id)
                    }
                }
                None => e.into(),
            });
        }

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM votes WHERE id=?1", VOTE_COLUMNS),
            params![id],
            vote_from_row,
        )
        .map_err(Into::into)
    }

    fn find_vote(&self, run_id: i64, problem_id: &str) -> StoreResult<Option<Vote>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM votes WHERE run_id=?1 AND problem_id=?2",
                    VOTE_COLUMNS
                ),
                params![run_id, problem_id],
                vote_from_row,
            )
            .optional()?)
    }

    fn list_votes(&self, run_id: i64) -> StoreResult<Vec<Vote>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM votes WHERE run_id=?1 ORDER BY id ASC",
            VOTE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![run_id], vote_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn scored_votes(&self, run_id: i64) -> StoreResult<Vec<ScoredVote>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT v.choice, p.human_pull_votes, p.human_nothing_votes
             FROM votes v
             JOIN problems p ON v.problem_id = p.id
             WHERE v.run_id = ?1
             ORDER BY v.id ASC",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok(ScoredVote {
                choice: choice_from_sql(row, 0)?,
                human_pull_votes: row.get::<_, i64>(1)?.max(0) as u64,
                human_nothing_votes: row.get::<_, i64>(2)?.max(0) as u64,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_problems(&self) -> StoreResult<Vec<Problem>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, text, human_pull_votes, human_nothing_votes
             FROM problems ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], problem_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_problem(&self, problem_id: &str) -> StoreResult<Option<Problem>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                "SELECT id, title, text, human_pull_votes, human_nothing_votes
                 FROM problems WHERE id=?1",
                params![problem_id],
                problem_from_row,
            )
            .optional()?)
    }

    fn get_provider(&self, provider_id: &str) -> StoreResult<Option<Provider>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                "SELECT id, name, voice_id FROM providers WHERE id=?1",
                params![provider_id],
                |row| {
                    Ok(Provider {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        voice_id: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }
}

enum Constraint {
    Unique,
    ForeignKey,
}

fn constraint_kind(e: &rusqlite::Error) -> Option<Constraint> {
    let rusqlite::Error::SqliteFailure(err, _) = e else {
        return None;
    };
    match err.extended_code {
        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            Some(Constraint::Unique)
        }
        rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
        _ => None,
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<ModelRun> {
    let effort: Option<String> = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(ModelRun {
        id: row.get(0)?,
        model: row.get(1)?,
        display_name: row.get(2)?,
        reasoning_effort: effort.as_deref().and_then(ReasoningEffort::parse),
        status: RunStatus::parse(&status),
        total_problems: row.get::<_, i64>(5)?.max(0) as u64,
        completed_problems: row.get::<_, i64>(6)?.max(0) as u64,
        alignment_score: row.get(7)?,
        provider_id: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn vote_from_row(row: &Row<'_>) -> rusqlite::Result<Vote> {
    let principles_json: String = row.get(5)?;
    let principles: Vec<String> = serde_json::from_str(&principles_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Vote {
        id: row.get(0)?,
        run_id: row.get(1)?,
        problem_id: row.get(2)?,
        choice: choice_from_sql(row, 3)?,
        reasoning: row.get(4)?,
        principles,
        assumptions: row.get(6)?,
        request_payload: row.get(7)?,
        audio_url: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn problem_from_row(row: &Row<'_>) -> rusqlite::Result<Problem> {
    Ok(Problem {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        human_pull_votes: row.get::<_, i64>(3)?.max(0) as u64,
        human_nothing_votes: row.get::<_, i64>(4)?.max(0) as u64,
    })
}

fn choice_from_sql(row: &Row<'_>, idx: usize) -> rusqlite::Result<Choice> {
    let s: String = row.get(idx)?;
    Choice::parse(&s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown choice {:?}", s).into(),
        )
    })
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
