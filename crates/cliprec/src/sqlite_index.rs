use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::IndexError;
use crate::index::{ClipIndex, ClipRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS clips (
    path TEXT PRIMARY KEY,
    location_name TEXT NOT NULL,
    start_ms INTEGER NOT NULL,
    end_ms INTEGER NOT NULL,
    prev_path TEXT NOT NULL DEFAULT '',
    width INTEGER NOT NULL DEFAULT 0,
    height INTEGER NOT NULL DEFAULT 0,
    committed_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_clips_location_start ON clips(location_name, start_ms);
"#;

/// SQLite clip index with connection-per-call, so the mover thread and
/// readers never share a connection.
#[derive(Debug, Clone)]
pub struct SqliteClipIndex {
    path: PathBuf,
}

impl SqliteClipIndex {
    /// Open (creating if needed) the index file and its schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    IndexError::Unavailable(format!("{}: {}", parent.display(), e))
                })?;
            }
        }
        let index = Self { path };
        index.conn()?.execute_batch(SCHEMA)?;
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<Connection, IndexError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        Ok(conn)
    }

    /// Clips ordered by start time, optionally for one location.
    pub fn list(&self, location_name: Option<&str>) -> Result<Vec<ClipRecord>, IndexError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT path, location_name, start_ms, end_ms, prev_path, width, height
             FROM clips
             WHERE ?1 IS NULL OR location_name = ?1
             ORDER BY start_ms, path",
        )?;
        let rows = stmt.query_map(params![location_name], row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get(&self, path: &str) -> Result<Option<ClipRecord>, IndexError> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT path, location_name, start_ms, end_ms, prev_path, width, height
                 FROM clips WHERE path = ?1",
                params![path],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Returns whether a row was deleted.
    pub fn remove(&self, path: &str) -> Result<bool, IndexError> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM clips WHERE path = ?1", params![path])?;
        Ok(changed > 0)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClipRecord> {
    Ok(ClipRecord {
        path: row.get(0)?,
        location_name: row.get(1)?,
        start_ms: row.get(2)?,
        end_ms: row.get(3)?,
        prev_path: row.get(4)?,
        width: row.get(5)?,
        height: row.get(6)?,
    })
}

impl ClipIndex for SqliteClipIndex {
    fn commit(&self, record: &ClipRecord) -> Result<(), IndexError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO clips
                (path, location_name, start_ms, end_ms, prev_path, width, height)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.path,
                record.location_name,
                record.start_ms,
                record.end_ms,
                record.prev_path,
                record.width,
                record.height,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(path: &str, location: &str, start_ms: i64) -> ClipRecord {
        ClipRecord {
            path: path.to_string(),
            location_name: location.to_string(),
            start_ms,
            end_ms: start_ms + 900,
            prev_path: String::new(),
            width: 320,
            height: 240,
        }
    }

    #[test]
    fn test_commit_get_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let index = SqliteClipIndex::open(dir.path().join("nested/clips.db")).unwrap();

        index.commit(&record("yard/seg02/seg02.mp4", "yard", 2_000)).unwrap();
        index.commit(&record("yard/seg01/seg01.mp4", "yard", 1_000)).unwrap();
        index.commit(&record("gate/seg01/seg01.mp4", "gate", 500)).unwrap();

        let yard: Vec<String> = index
            .list(Some("yard"))
            .unwrap()
            .into_iter()
            .map(|r| r.path)
            .collect();
        assert_eq!(yard, vec!["yard/seg01/seg01.mp4", "yard/seg02/seg02.mp4"]);
        assert_eq!(index.list(None).unwrap().len(), 3);

        let got = index.get("gate/seg01/seg01.mp4").unwrap().unwrap();
        assert_eq!(got, record("gate/seg01/seg01.mp4", "gate", 500));

        assert!(index.remove("gate/seg01/seg01.mp4").unwrap());
        assert!(!index.remove("gate/seg01/seg01.mp4").unwrap());
        assert!(index.get("gate/seg01/seg01.mp4").unwrap().is_none());
    }

    #[test]
    fn test_recommit_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let index = SqliteClipIndex::open(dir.path().join("clips.db")).unwrap();

        let mut rec = record("yard/a/a.mp4", "yard", 0);
        index.commit(&rec).unwrap();
        rec.end_ms = 5_000;
        index.commit(&rec).unwrap();

        let all = index.list(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].end_ms, 5_000);
    }
}
