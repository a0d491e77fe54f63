//! In-memory store with an explicit flush.
//!
//! All reads and writes run against a RAM-resident database; `save` copies
//! the whole image to the target file with the SQLite backup API, so the
//! file it leaves behind is byte-compatible with [`SqliteStore`]. Intended
//! for sandboxed hosts where synchronous disk IO is off-limits until an
//! explicit checkpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::Connection;

use crate::error::StoreError;
use crate::graph::{CallGraph, Edge, Node};

use super::{reconstruct_graph, sql, GraphStore};

const BACKUP_PAGES_PER_STEP: std::os::raw::c_int = 256;

/// RAM-backed SQLite store with flush-on-save semantics.
pub struct MemoryStore {
    conn: Connection,
    /// Flush target; a detached store (`None`) never touches disk.
    path: Option<PathBuf>,
    dirty: bool,
}

impl MemoryStore {
    /// A detached in-memory store (tests, throwaway analysis).
    pub fn new() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::Open)?;
        sql::ensure_schema(&conn).map_err(StoreError::Open)?;
        Ok(Self {
            conn,
            path: None,
            dirty: false,
        })
    }

    /// An in-memory store mirroring `path`: existing contents are loaded
    /// into RAM, and `save`/`close` write the image back.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut store = Self::new()?;
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            let src = Connection::open(&path).map_err(StoreError::Open)?;
            run_backup(&src, &mut store.conn).map_err(StoreError::Open)?;
        }
        store.path = Some(path);
        Ok(store)
    }

    /// True when the RAM image has changes the flush target has not seen.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

fn run_backup(src: &Connection, dst: &mut Connection) -> rusqlite::Result<()> {
    let backup = Backup::new(src, dst)?;
    backup.run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None)
}

impl GraphStore for MemoryStore {
    fn save_graph(&mut self, graph: &CallGraph) -> Result<(), StoreError> {
        // BEGIN/COMMIT are cheap no-op-equivalents against RAM; the same
        // transactional write path keeps the SQL identical to the native
        // back-end.
        sql::write_graph(&mut self.conn, graph).map_err(StoreError::Write)?;
        self.dirty = true;
        // Schema-mutating writes flush eagerly when a target is attached.
        if self.path.is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn get_node(&self, id: &str) -> Result<Option<Node>, StoreError> {
        sql::get_node(&self.conn, id)
    }

    fn all_nodes(&self) -> Result<Vec<Node>, StoreError> {
        sql::all_nodes(&self.conn)
    }

    fn all_edges(&self) -> Result<Vec<Edge>, StoreError> {
        sql::all_edges(&self.conn)
    }

    fn edges_from(&self, id: &str) -> Result<Vec<Edge>, StoreError> {
        sql::edges_from(&self.conn, id)
    }

    fn edges_to(&self, id: &str) -> Result<Vec<Edge>, StoreError> {
        sql::edges_to(&self.conn, id)
    }

    fn find_by_id_or_label(&self, query: &str, limit: u32) -> Result<Vec<Node>, StoreError> {
        sql::find_by_id_or_label(&self.conn, query, limit)
    }

    fn source_root(&self) -> Result<Option<String>, StoreError> {
        sql::source_root(&self.conn)
    }

    fn load_graph(&self) -> Result<CallGraph, StoreError> {
        Ok(reconstruct_graph(
            self.all_nodes()?,
            self.all_edges()?,
            self.source_root()?,
        ))
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        // Write into a fresh file connection; the backup replaces its
        // contents wholesale.
        let mut dst = Connection::open(&path).map_err(StoreError::Flush)?;
        run_backup(&self.conn, &mut dst).map_err(StoreError::Flush)?;
        dst.close().map_err(|(_, e)| StoreError::Flush(e))?;
        self.dirty = false;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), StoreError> {
        self.save()?;
        let MemoryStore { conn, .. } = *self;
        conn.close().map_err(|(_, e)| StoreError::Flush(e))
    }
}
