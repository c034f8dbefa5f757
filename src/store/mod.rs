//! Bug record storage: SQLite + vector index kept in lockstep
//!
//! SQLite is the source of truth (full record, embedding blob for rebuilds);
//! the vector index answers nearest-neighbor queries keyed by SQLite rowid.
//! Every mutation goes through this wrapper so neither store can drift: a
//! record has exactly one vector and a vector exactly one record.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::StoreError;
use crate::index::{IndexMetadata, MetadataFilter, VectorIndex};
use crate::record::{BugRecord, Source};

/// A hydrated search hit from the index
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub rowid: i64,
    pub record: BugRecord,
    pub similarity: f32,
}

/// Dual storage for bug records: SQLite + vector index
pub struct BugStore {
    db: Connection,
    index: Box<dyn VectorIndex>,
}

impl BugStore {
    /// Open the store at `db_path`, backed by the given vector index.
    ///
    /// The index is expected to be in sync with the database (same rowid
    /// keys); `rebuild_index` restores sync from the stored embedding blobs.
    pub fn open<P: AsRef<Path>>(db_path: P, index: Box<dyn VectorIndex>) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Connection::open(db_path).context("Failed to open SQLite database")?;
        Self::init_schema(&db)?;

        Ok(Self { db, index })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute(
            "CREATE TABLE IF NOT EXISTS bugs (
                rowid INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT UNIQUE NOT NULL,
                error_pattern TEXT NOT NULL,
                context TEXT NOT NULL,
                language TEXT,
                framework TEXT,
                problem_description TEXT NOT NULL,
                solution TEXT NOT NULL,
                source TEXT NOT NULL,
                confidence_score INTEGER NOT NULL,
                tags TEXT NOT NULL,
                date_fixed TEXT,
                url TEXT,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Insert a record and its embedding into both stores.
    ///
    /// Validates first; embeds exactly once (the caller supplies the vector).
    /// If the index rejects the vector the row is rolled back, so a failed
    /// insert leaves no orphan on either side.
    pub fn insert(&mut self, record: &BugRecord, embedding: &[f32]) -> Result<i64> {
        record.validate()?;

        let tags_json = serde_json::to_string(&record.tags)?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let rowid: i64 = self.db.query_row(
            "INSERT INTO bugs (id, error_pattern, context, language, framework,
                problem_description, solution, source, confidence_score, tags,
                date_fixed, url, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             RETURNING rowid",
            params![
                record.id.to_string(),
                &record.error_pattern,
                &record.context,
                &record.language,
                &record.framework,
                &record.problem_description,
                &record.solution,
                record.source.to_string(),
                record.confidence_score,
                tags_json,
                record.date_fixed,
                &record.url,
                vec_f32_to_bytes(embedding),
                created_at,
            ],
            |row| row.get(0),
        )?;

        let metadata = IndexMetadata {
            language: record.language.clone(),
            framework: record.framework.clone(),
        };

        if let Err(e) = self.index.upsert(rowid as u64, embedding, metadata) {
            // Roll the row back so the record store doesn't hold an entry the
            // index will never surface
            self.db
                .execute("DELETE FROM bugs WHERE rowid = ?1", params![rowid])?;
            return Err(e.context("Vector insert failed; record rolled back"));
        }

        Ok(rowid)
    }

    /// Delete a record from both stores. Ok(false) when the id is unknown.
    ///
    /// The vector goes first; if the row delete then fails, the vector is
    /// restored from the stored embedding blob so the stores stay in lockstep.
    pub fn delete(&mut self, id: Uuid) -> Result<bool> {
        let row: Option<(i64, Vec<u8>, Option<String>, Option<String>)> = self
            .db
            .query_row(
                "SELECT rowid, embedding, language, framework FROM bugs WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((rowid, embedding_blob, language, framework)) = row else {
            return Ok(false);
        };

        self.index.delete(rowid as u64)?;

        if let Err(e) = self
            .db
            .execute("DELETE FROM bugs WHERE rowid = ?1", params![rowid])
        {
            let embedding = bytes_to_vec_f32(&embedding_blob);
            self.index.upsert(
                rowid as u64,
                &embedding,
                IndexMetadata {
                    language,
                    framework,
                },
            )?;
            return Err(e).context("Row delete failed; vector restored");
        }

        Ok(true)
    }

    /// Look up a record by its public id
    pub fn get(&self, id: Uuid) -> Result<Option<BugRecord>> {
        let rowid: Option<i64> = self
            .db
            .query_row(
                "SELECT rowid FROM bugs WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match rowid {
            Some(rowid) => self.load_by_rowid(rowid),
            None => Ok(None),
        }
    }

    /// Nearest-neighbor search, hydrated to full records.
    ///
    /// An index hit whose row has vanished is a recoverable inconsistency:
    /// logged and skipped rather than failing the whole search.
    pub fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>> {
        let matches = self.index.query(embedding, top_k, filter)?;

        let mut hits = Vec::with_capacity(matches.len());
        for m in matches {
            let rowid = m.id as i64;
            match self.load_by_rowid(rowid)? {
                Some(record) => hits.push(SearchHit {
                    rowid,
                    record,
                    similarity: m.similarity,
                }),
                None => {
                    let inconsistency = StoreError::Inconsistency { rowid };
                    eprintln!("{} {}", "⚠️  skipping:".yellow(), inconsistency);
                }
            }
        }

        Ok(hits)
    }

    /// Load every record (ingestion reports, status output)
    pub fn load_all(&self) -> Result<Vec<BugRecord>> {
        let mut stmt = self.db.prepare("SELECT rowid FROM bugs ORDER BY rowid")?;
        let rowids: Vec<i64> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rowids.len());
        for rowid in rowids {
            if let Some(record) = self.load_by_rowid(rowid)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM bugs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Re-populate the vector index from the stored embedding blobs.
    ///
    /// Used after an index file is lost or when swapping index backends.
    /// Records are embedded exactly once at ingestion; a rebuild reuses those
    /// vectors instead of re-running the model.
    pub fn rebuild_index(&mut self) -> Result<usize> {
        let mut stmt = self
            .db
            .prepare("SELECT rowid, embedding, language, framework FROM bugs ORDER BY rowid")?;
        let rows: Vec<(i64, Vec<u8>, Option<String>, Option<String>)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        let count = rows.len();
        for (rowid, blob, language, framework) in rows {
            let embedding = bytes_to_vec_f32(&blob);
            self.index.upsert(
                rowid as u64,
                &embedding,
                IndexMetadata {
                    language,
                    framework,
                },
            )?;
        }

        Ok(count)
    }

    /// Persist the index to disk where the backend is file-backed
    pub fn persist_index(&self) -> Result<()> {
        self.index.persist()
    }

    fn load_by_rowid(&self, rowid: i64) -> Result<Option<BugRecord>> {
        let result = self.db.query_row(
            "SELECT id, error_pattern, context, language, framework,
                    problem_description, solution, source, confidence_score,
                    tags, date_fixed, url
             FROM bugs WHERE rowid = ?1",
            params![rowid],
            |row| {
                let id_str: String = row.get(0)?;
                let source_str: String = row.get(7)?;
                let tags_str: String = row.get(9)?;

                let id = Uuid::parse_str(&id_str).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                let source = Source::from_str(&source_str).unwrap_or_default();
                let tags: Vec<String> = serde_json::from_str(&tags_str).unwrap_or_default();

                Ok(BugRecord {
                    id,
                    error_pattern: row.get(1)?,
                    context: row.get(2)?,
                    language: row.get(3)?,
                    framework: row.get(4)?,
                    problem_description: row.get(5)?,
                    solution: row.get(6)?,
                    source,
                    confidence_score: row.get(8)?,
                    tags,
                    date_fixed: row.get::<_, Option<NaiveDate>>(10)?,
                    url: row.get(11)?,
                })
            },
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Serialize an f32 vector to little-endian bytes for BLOB storage
pub fn vec_f32_to_bytes(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize little-endian BLOB bytes back to an f32 vector
pub fn bytes_to_vec_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::BruteForceIndex;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    const DIM: usize = 4;

    fn open_store(temp: &TempDir) -> BugStore {
        BugStore::open(
            temp.path().join("bugs.db"),
            Box::new(BruteForceIndex::new(DIM)),
        )
        .unwrap()
    }

    fn record(error: &str, language: Option<&str>, confidence: u8) -> BugRecord {
        BugRecord {
            id: Uuid::new_v4(),
            error_pattern: error.to_string(),
            context: "test context".to_string(),
            language: language.map(String::from),
            framework: None,
            problem_description: String::new(),
            solution: "a fix".to_string(),
            source: Source::Personal,
            confidence_score: confidence,
            tags: vec!["test".to_string()],
            date_fixed: None,
            url: None,
        }
    }

    #[test]
    fn test_insert_and_search_roundtrip() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let rec = record("TypeError: boom", Some("python"), 50);
        store.insert(&rec, &[1.0, 0.0, 0.0, 0.0]).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.index_len(), 1);

        let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 5, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.error_pattern, "TypeError: boom");
        assert_relative_eq!(hits[0].similarity, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_insert_invalid_record_rejected_without_orphans() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let mut rec = record("E: x", None, 10);
        rec.solution = String::new();
        assert!(store.insert(&rec, &[1.0, 0.0, 0.0, 0.0]).is_err());

        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.index_len(), 0);
    }

    #[test]
    fn test_insert_bad_vector_rolls_back_row() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        // Wrong dimension: the index rejects it, the row must roll back
        let rec = record("E: dims", None, 10);
        assert!(store.insert(&rec, &[1.0, 0.0]).is_err());

        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.index_len(), 0);
    }

    #[test]
    fn test_delete_removes_from_both_stores() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let rec = record("E: gone", None, 10);
        store.insert(&rec, &[0.0, 1.0, 0.0, 0.0]).unwrap();

        assert!(store.delete(rec.id).unwrap());
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.index_len(), 0);
        assert!(store.get(rec.id).unwrap().is_none());
        assert!(store.search(&[0.0, 1.0, 0.0, 0.0], 5, None).unwrap().is_empty());
    }

    #[test]
    fn test_delete_unknown_id_is_ok_false() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);
        assert!(!store.delete(Uuid::new_v4()).unwrap());
    }

    #[test]
    fn test_rebuild_index_from_blobs() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let a = record("E: a", Some("python"), 10);
        let b = record("E: b", Some("rust"), 10);
        store.insert(&a, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        store.insert(&b, &[0.0, 1.0, 0.0, 0.0]).unwrap();

        // Swap in a fresh, empty index and rebuild from stored embeddings
        store.index = Box::new(BruteForceIndex::new(DIM));
        assert_eq!(store.index_len(), 0);

        let count = store.rebuild_index().unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.index_len(), 2);

        let filter = MetadataFilter::Language("rust".to_string());
        let hits = store.search(&[0.0, 1.0, 0.0, 0.0], 5, Some(&filter)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.error_pattern, "E: b");
    }

    #[test]
    fn test_search_skips_index_hit_with_missing_row() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let kept = record("E: kept", None, 10);
        let orphaned = record("E: orphaned", None, 10);
        store.insert(&kept, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        let rowid = store.insert(&orphaned, &[0.9, 0.1, 0.0, 0.0]).unwrap();

        // Remove the row behind the store's back, leaving its vector in the
        // index: the divergent hit must be skipped, not fail the search
        store
            .db
            .execute("DELETE FROM bugs WHERE rowid = ?1", params![rowid])
            .unwrap();
        assert_eq!(store.index_len(), 2);

        let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 5, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.error_pattern, "E: kept");
    }

    #[test]
    fn test_blob_roundtrip() {
        let vec = vec![1.0, 2.5, -3.14159, 0.0];
        let bytes = vec_f32_to_bytes(&vec);
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes_to_vec_f32(&bytes), vec);
    }

    #[test]
    fn test_get_preserves_all_fields() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let mut rec = record("E: full", Some("python"), 80);
        rec.framework = Some("django".to_string());
        rec.date_fixed = NaiveDate::from_ymd_opt(2024, 3, 1);
        rec.url = Some("https://example.com/q/1".to_string());
        store.insert(&rec, &[0.5, 0.5, 0.0, 0.0]).unwrap();

        let loaded = store.get(rec.id).unwrap().unwrap();
        assert_eq!(loaded.framework.as_deref(), Some("django"));
        assert_eq!(loaded.date_fixed, rec.date_fixed);
        assert_eq!(loaded.url, rec.url);
        assert_eq!(loaded.confidence_score, 80);
        assert_eq!(loaded.tags, vec!["test".to_string()]);
    }
}
