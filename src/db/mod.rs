use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

mod migrations;

use crate::models::{DailySummary, InspectionRecord, NewInspectionRecord, Verdict};
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Reconnect(mpsc::Sender<Result<()>>),
    Shutdown,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("no records to delete")]
    Empty,
}

/// Durable storage for inspection outcomes, as the session consumes it.
///
/// `reconnect` backs the at-most-one-retry insert policy; `delete_most_recent`
/// backs the "try again" workflow and must pick the most recently *inserted*
/// record, not the latest timestamp.
pub trait ResultStore: Send + Sync {
    fn insert(&self, record: &NewInspectionRecord) -> Result<i64, StoreError>;
    fn reconnect(&self) -> Result<(), StoreError>;
    fn delete_most_recent(&self) -> Result<i64, StoreError>;
    fn records_for_date(&self, date: NaiveDate) -> Result<Vec<InspectionRecord>, StoreError>;
    fn summary_for_date(&self, date: NaiveDate) -> Result<DailySummary, StoreError>;
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn verdict_from_str(value: &str) -> Result<Verdict> {
    match value {
        "PASS" => Ok(Verdict::Pass),
        "FAIL" => Ok(Verdict::Fail),
        _ => Err(anyhow!("unknown verdict '{value}'")),
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path).context("failed to open SQLite database")?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }
    if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
        error!("Failed to enable foreign keys: {err}");
    }

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

/// SQLite-backed [`ResultStore`]. A dedicated thread owns the connection;
/// callers submit closures over a command channel and block on the reply, so
/// the handle stays cheap to clone and safe to share.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("circlip-db".into())
            .spawn(move || {
                let mut conn = match open_connection(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                if ready_tx.send(Ok(())).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Reconnect(reply) => {
                            let result = open_connection(&path_for_thread).map(|fresh| {
                                conn = fresh;
                            });
                            if reply.send(result).is_err() {
                                error!("DB caller dropped before receiving reconnect result");
                            }
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .recv()
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Reopen the connection on the database thread. The timestamp of the
    /// request is irrelevant to queued work: commands ahead of it still run
    /// against the old connection.
    pub fn reconnect(&self) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();

        self.inner
            .sender
            .send(DbCommand::Reconnect(reply_tx))
            .map_err(|err| anyhow!("failed to send reconnect to DB thread: {err}"))?;

        reply_rx
            .recv()
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Insert one inspection outcome; the store stamps the timestamp.
    pub fn insert_record(&self, record: &NewInspectionRecord) -> Result<i64> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO inspection_results
                     (timestamp, single_percent, multiple_percent, no_circlip_percent, result)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Utc::now().to_rfc3339(),
                    record.single_percent,
                    record.multiple_percent,
                    record.no_circlip_percent,
                    record.verdict.as_str(),
                ],
            )
            .with_context(|| "failed to insert inspection record")?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Remove the most recently inserted record (highest id, so two records
    /// sharing a timestamp stay unambiguous). Returns the removed id, or None
    /// when the table is empty.
    pub fn delete_most_recent(&self) -> Result<Option<i64>> {
        self.execute(|conn| {
            let last_id: Option<i64> = conn
                .query_row(
                    "SELECT id FROM inspection_results ORDER BY id DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()
                .context("failed to look up most recent record")?;

            let Some(id) = last_id else {
                return Ok(None);
            };

            conn.execute("DELETE FROM inspection_results WHERE id = ?1", params![id])
                .with_context(|| "failed to delete most recent record")?;
            Ok(Some(id))
        })
    }

    pub fn records_for_date(&self, date: NaiveDate) -> Result<Vec<InspectionRecord>> {
        let day = date.format("%Y-%m-%d").to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, single_percent, multiple_percent, no_circlip_percent, result
                 FROM inspection_results
                 WHERE date(timestamp) = ?1
                 ORDER BY timestamp DESC",
            )?;

            let mut rows = stmt.query(params![day])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(InspectionRecord {
                    id: row.get(0)?,
                    timestamp: parse_datetime(&row.get::<_, String>(1)?)?,
                    single_percent: row.get(2)?,
                    multiple_percent: row.get(3)?,
                    no_circlip_percent: row.get(4)?,
                    verdict: verdict_from_str(&row.get::<_, String>(5)?)?,
                });
            }

            Ok(records)
        })
    }

    pub fn summary_for_date(&self, date: NaiveDate) -> Result<DailySummary> {
        let day = date.format("%Y-%m-%d").to_string();
        self.execute(move |conn| {
            let (total, passed): (i64, Option<i64>) = conn
                .query_row(
                    "SELECT COUNT(*), SUM(CASE WHEN result = 'PASS' THEN 1 ELSE 0 END)
                     FROM inspection_results
                     WHERE date(timestamp) = ?1",
                    params![day],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .context("failed to aggregate daily summary")?;

            let passed = passed.unwrap_or(0);
            Ok(DailySummary {
                total: total as u32,
                passed: passed as u32,
                failed: (total - passed) as u32,
            })
        })
    }
}

fn store_err(err: anyhow::Error) -> StoreError {
    StoreError::Database(format!("{err:#}"))
}

impl ResultStore for Database {
    fn insert(&self, record: &NewInspectionRecord) -> Result<i64, StoreError> {
        self.insert_record(record).map_err(store_err)
    }

    fn reconnect(&self) -> Result<(), StoreError> {
        Database::reconnect(self).map_err(store_err)
    }

    fn delete_most_recent(&self) -> Result<i64, StoreError> {
        match Database::delete_most_recent(self) {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(StoreError::Empty),
            Err(err) => Err(store_err(err)),
        }
    }

    fn records_for_date(&self, date: NaiveDate) -> Result<Vec<InspectionRecord>, StoreError> {
        Database::records_for_date(self, date).map_err(store_err)
    }

    fn summary_for_date(&self, date: NaiveDate) -> Result<DailySummary, StoreError> {
        Database::summary_for_date(self, date).map_err(store_err)
    }
}
