//! SQLite block ledger
//!
//! Records every processed block, accumulates the per-TLD counters that the
//! upload payload does not carry, and holds the outbox of payloads whose
//! upload failed.

use crate::aggregate::TldStat;
use crate::state::CandidateSource;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::fmt;
use std::fs;
use std::path::Path;

/// What happened to a block's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// Accepted by the backend
    Uploaded,
    /// Upload failed; the payload waits in the outbox
    Queued,
}

impl UploadStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Queued => "queued",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(Self::Uploaded),
            "queued" => Some(Self::Queued),
            _ => None,
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Counters for a block about to be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlock {
    pub config_hash: String,
    pub mode: CandidateSource,
    pub candidates: u64,
    pub registered: u64,
    pub resolver_errors: u64,

    /// Set when the upload failed and the payload must go to the outbox
    pub pending_upload: Option<PendingUpload>,
}

impl NewBlock {
    pub fn upload_status(&self) -> UploadStatus {
        if self.pending_upload.is_some() {
            UploadStatus::Queued
        } else {
            UploadStatus::Uploaded
        }
    }
}

/// A payload whose upload failed, with the error that stopped it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub payload: String,
    pub error: String,
}

/// A processed block as recorded in the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub id: i64,
    pub finished_at: String,
    pub config_hash: String,
    pub mode: CandidateSource,
    pub candidates: u64,
    pub registered: u64,
    pub resolver_errors: u64,
    pub upload_status: UploadStatus,
}

/// A payload waiting to be re-uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub id: i64,
    pub created_at: String,
    pub payload: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Totals across every recorded block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifetimeTotals {
    pub blocks: u64,
    pub candidates: u64,
    pub registered: u64,
    pub resolver_errors: u64,
    pub queued_uploads: u64,
}

/// Block ledger backed by SQLite
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Opens or creates the ledger at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the SQLite file. Missing parent directories
    ///   are created.
    ///
    /// # Returns
    ///
    /// A ledger with the schema in place and WAL journaling enabled.
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory ledger (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Blocks =====

    /// Records a processed block in one transaction
    ///
    /// The block row, its TLD totals and, for a failed upload, its outbox
    /// entry are written together. `persist` runs inside the transaction,
    /// after those writes and before the commit; if it fails, nothing is
    /// recorded.
    ///
    /// # Arguments
    ///
    /// * `block` - The block's counters and upload outcome
    /// * `tld_stats` - The block's TLD buckets, added to the lifetime totals
    /// * `persist` - Saves whatever must move in step with the ledger
    ///   (the collector's cursors)
    ///
    /// # Returns
    ///
    /// The new block's row id.
    pub fn commit_block<'a, I, F, E>(
        &mut self,
        block: &NewBlock,
        tld_stats: I,
        persist: F,
    ) -> Result<i64, E>
    where
        I: IntoIterator<Item = &'a TldStat>,
        F: FnOnce() -> Result<(), E>,
        E: From<StorageError>,
    {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().map_err(StorageError::from)?;

        let block_id = insert_block(&tx, block, &now)?;
        upsert_tld_totals(&tx, tld_stats, &now)?;
        if let Some(pending) = &block.pending_upload {
            insert_outbox(&tx, pending, &now)?;
        }

        persist()?;

        tx.commit().map_err(StorageError::from)?;
        Ok(block_id)
    }

    /// Most recent blocks, newest first
    pub fn recent_blocks(&self, limit: usize) -> StorageResult<Vec<BlockRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, finished_at, config_hash, mode, candidates, registered, resolver_errors, upload_status
             FROM blocks ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], read_block_row)?;

        let mut blocks = Vec::new();
        for row in rows {
            let (id, finished_at, config_hash, mode, candidates, registered, errors, status) = row?;
            blocks.push(BlockRecord {
                id,
                finished_at,
                config_hash,
                mode: CandidateSource::parse(&mode)
                    .ok_or_else(|| StorageError::InvalidValue(format!("block mode '{}'", mode)))?,
                candidates: from_sql_count(candidates),
                registered: from_sql_count(registered),
                resolver_errors: from_sql_count(errors),
                upload_status: UploadStatus::from_db_string(&status).ok_or_else(|| {
                    StorageError::InvalidValue(format!("upload status '{}'", status))
                })?,
            });
        }

        Ok(blocks)
    }

    /// Totals across every recorded block
    pub fn lifetime_totals(&self) -> StorageResult<LifetimeTotals> {
        let (blocks, candidates, registered, resolver_errors): (i64, i64, i64, i64) =
            self.conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(candidates), 0), COALESCE(SUM(registered), 0),
                        COALESCE(SUM(resolver_errors), 0)
                 FROM blocks",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        let queued: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM outbox", [], |row| row.get(0))?;

        Ok(LifetimeTotals {
            blocks: from_sql_count(blocks),
            candidates: from_sql_count(candidates),
            registered: from_sql_count(registered),
            resolver_errors: from_sql_count(resolver_errors),
            queued_uploads: from_sql_count(queued),
        })
    }

    // ===== TLD Totals =====

    /// Lifetime TLD totals, sorted by TLD
    pub fn tld_totals(&self) -> StorageResult<Vec<TldStat>> {
        let mut stmt = self.conn.prepare(
            "SELECT tld, domains_checked_total, short_domains_checked_total,
                    short_unregistered_count, short_no_website_count, short_active_site_count
             FROM tld_totals ORDER BY tld",
        )?;

        let totals = stmt
            .query_map([], |row| {
                Ok(TldStat {
                    tld: row.get(0)?,
                    domains_checked_total: from_sql_count(row.get(1)?),
                    short_domains_checked_total: from_sql_count(row.get(2)?),
                    short_unregistered_count: from_sql_count(row.get(3)?),
                    short_no_website_count: from_sql_count(row.get(4)?),
                    short_active_site_count: from_sql_count(row.get(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(totals)
    }

    // ===== Outbox =====

    /// Queued payloads, oldest first
    pub fn pending_outbox(&self) -> StorageResult<Vec<OutboxEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, payload, attempts, last_error FROM outbox ORDER BY id",
        )?;

        let entries = stmt
            .query_map([], |row| {
                Ok(OutboxEntry {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    payload: row.get(2)?,
                    attempts: row.get(3)?,
                    last_error: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Drops an entry after its payload was delivered
    pub fn remove_outbox(&mut self, id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM outbox WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Notes another failed delivery attempt
    pub fn record_outbox_failure(&mut self, id: i64, error: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE outbox SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
            params![id, error],
        )?;
        Ok(())
    }

    // ===== Maintenance =====

    /// Clears blocks, TLD totals, and the outbox
    pub fn clear_stats(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM blocks;
            DELETE FROM tld_totals;
            DELETE FROM outbox;
        ",
        )?;
        Ok(())
    }
}

type BlockRow = (i64, String, String, String, i64, i64, i64, String);

fn read_block_row(row: &Row<'_>) -> rusqlite::Result<BlockRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn insert_block(conn: &Connection, block: &NewBlock, now: &str) -> StorageResult<i64> {
    conn.execute(
        "INSERT INTO blocks (finished_at, config_hash, mode, candidates, registered, resolver_errors, upload_status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            now,
            block.config_hash,
            block.mode.as_str(),
            to_sql_count(block.candidates),
            to_sql_count(block.registered),
            to_sql_count(block.resolver_errors),
            block.upload_status().to_db_string()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn upsert_tld_totals<'a, I>(conn: &Connection, stats: I, now: &str) -> StorageResult<()>
where
    I: IntoIterator<Item = &'a TldStat>,
{
    let mut stmt = conn.prepare(
        "INSERT INTO tld_totals (tld, domains_checked_total, short_domains_checked_total,
             short_unregistered_count, short_no_website_count, short_active_site_count, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(tld) DO UPDATE SET
             domains_checked_total = domains_checked_total + excluded.domains_checked_total,
             short_domains_checked_total = short_domains_checked_total + excluded.short_domains_checked_total,
             short_unregistered_count = short_unregistered_count + excluded.short_unregistered_count,
             short_no_website_count = short_no_website_count + excluded.short_no_website_count,
             short_active_site_count = short_active_site_count + excluded.short_active_site_count,
             updated_at = excluded.updated_at",
    )?;
    for stat in stats {
        stmt.execute(params![
            stat.tld,
            to_sql_count(stat.domains_checked_total),
            to_sql_count(stat.short_domains_checked_total),
            to_sql_count(stat.short_unregistered_count),
            to_sql_count(stat.short_no_website_count),
            to_sql_count(stat.short_active_site_count),
            now
        ])?;
    }
    Ok(())
}

fn insert_outbox(conn: &Connection, pending: &PendingUpload, now: &str) -> StorageResult<i64> {
    conn.execute(
        "INSERT INTO outbox (created_at, payload, attempts, last_error) VALUES (?1, ?2, 1, ?3)",
        params![now, pending.payload, pending.error],
    )?;
    Ok(conn.last_insert_rowid())
}

fn to_sql_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn from_sql_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn block(mode: CandidateSource, candidates: u64, registered: u64, errors: u64) -> NewBlock {
        NewBlock {
            config_hash: "abc123".to_string(),
            mode,
            candidates,
            registered,
            resolver_errors: errors,
            pending_upload: None,
        }
    }

    fn queued(mut block: NewBlock, payload: &str, error: &str) -> NewBlock {
        block.pending_upload = Some(PendingUpload {
            payload: payload.to_string(),
            error: error.to_string(),
        });
        block
    }

    fn tld_stat(tld: &str, checked: u64, unregistered: u64) -> TldStat {
        TldStat {
            tld: tld.to_string(),
            domains_checked_total: checked,
            short_domains_checked_total: checked,
            short_unregistered_count: unregistered,
            short_no_website_count: 0,
            short_active_site_count: 0,
        }
    }

    fn commit(ledger: &mut Ledger, block: &NewBlock, stats: &[TldStat]) -> i64 {
        ledger
            .commit_block(block, stats, || Ok::<(), StorageError>(()))
            .unwrap()
    }

    #[test]
    fn test_upload_status_roundtrip() {
        for status in [UploadStatus::Uploaded, UploadStatus::Queued] {
            let s = status.to_db_string();
            assert_eq!(UploadStatus::from_db_string(s), Some(status));
        }
        assert_eq!(UploadStatus::from_db_string("lost"), None);
    }

    #[test]
    fn test_record_and_list_blocks() {
        let mut ledger = Ledger::new_in_memory().unwrap();
        commit(&mut ledger, &block(CandidateSource::Short, 40, 12, 1), &[]);
        commit(
            &mut ledger,
            &queued(block(CandidateSource::Word, 30, 25, 0), "{}", "status 500"),
            &[],
        );

        let blocks = ledger.recent_blocks(10).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].mode, CandidateSource::Word);
        assert_eq!(blocks[0].upload_status, UploadStatus::Queued);
        assert_eq!(blocks[1].candidates, 40);
        assert_eq!(blocks[1].upload_status, UploadStatus::Uploaded);
        assert_eq!(blocks[1].config_hash, "abc123");

        assert_eq!(ledger.recent_blocks(1).unwrap().len(), 1);
    }

    #[test]
    fn test_lifetime_totals() {
        let mut ledger = Ledger::new_in_memory().unwrap();
        assert_eq!(ledger.lifetime_totals().unwrap(), LifetimeTotals::default());

        commit(&mut ledger, &block(CandidateSource::Short, 40, 12, 1), &[]);
        commit(
            &mut ledger,
            &queued(block(CandidateSource::Short, 25, 3, 2), "{}", "status 500"),
            &[],
        );

        let totals = ledger.lifetime_totals().unwrap();
        assert_eq!(totals.blocks, 2);
        assert_eq!(totals.candidates, 65);
        assert_eq!(totals.registered, 15);
        assert_eq!(totals.resolver_errors, 3);
        assert_eq!(totals.queued_uploads, 1);
    }

    #[test]
    fn test_tld_totals_accumulate() {
        let mut ledger = Ledger::new_in_memory().unwrap();
        let short = block(CandidateSource::Short, 15, 0, 0);
        commit(&mut ledger, &short, &[tld_stat("io", 10, 4), tld_stat("com", 5, 0)]);
        commit(&mut ledger, &short, &[tld_stat("io", 7, 1)]);

        let totals = ledger.tld_totals().unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].tld, "com");
        assert_eq!(totals[1].domains_checked_total, 17);
        assert_eq!(totals[1].short_unregistered_count, 5);
    }

    #[test]
    fn test_failed_persist_records_nothing() {
        let mut ledger = Ledger::new_in_memory().unwrap();
        let failed = queued(block(CandidateSource::Short, 40, 12, 1), "{}", "timeout");

        let result = ledger.commit_block(&failed, &[tld_stat("io", 10, 4)], || {
            Err(StorageError::InvalidValue("cursor file is read-only".to_string()))
        });
        assert!(matches!(result, Err(StorageError::InvalidValue(_))));

        assert_eq!(ledger.lifetime_totals().unwrap(), LifetimeTotals::default());
        assert!(ledger.tld_totals().unwrap().is_empty());
        assert!(ledger.pending_outbox().unwrap().is_empty());

        // The connection is still usable afterwards
        commit(&mut ledger, &block(CandidateSource::Short, 40, 12, 1), &[]);
        assert_eq!(ledger.lifetime_totals().unwrap().blocks, 1);
    }

    #[test]
    fn test_outbox_fifo() {
        let mut ledger = Ledger::new_in_memory().unwrap();
        let short = block(CandidateSource::Short, 2, 0, 0);
        commit(&mut ledger, &queued(short.clone(), "{\"n\":1}", "timeout"), &[]);
        commit(&mut ledger, &queued(short, "{\"n\":2}", "status 502"), &[]);

        let pending = ledger.pending_outbox().unwrap();
        let (first, second) = (pending[0].id, pending[1].id);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[0].last_error.as_deref(), Some("timeout"));

        ledger.record_outbox_failure(first, "status 503").unwrap();

        let pending = ledger.pending_outbox().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first);
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("status 503"));
        assert_eq!(pending[1].payload, "{\"n\":2}");

        ledger.remove_outbox(first).unwrap();
        let pending = ledger.pending_outbox().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second);
    }

    #[test]
    fn test_clear_stats() {
        let mut ledger = Ledger::new_in_memory().unwrap();
        commit(
            &mut ledger,
            &queued(block(CandidateSource::Short, 40, 12, 1), "{}", "timeout"),
            &[tld_stat("io", 10, 4)],
        );

        ledger.clear_stats().unwrap();
        assert_eq!(ledger.lifetime_totals().unwrap(), LifetimeTotals::default());
        assert!(ledger.tld_totals().unwrap().is_empty());
        assert!(ledger.pending_outbox().unwrap().is_empty());
    }

    #[test]
    fn test_ledger_persists_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("ledger.db");
        {
            let mut ledger = Ledger::new(&path).unwrap();
            commit(&mut ledger, &block(CandidateSource::Word, 30, 20, 0), &[]);
        }

        let ledger = Ledger::new(&path).unwrap();
        assert_eq!(ledger.lifetime_totals().unwrap().blocks, 1);
    }
}
