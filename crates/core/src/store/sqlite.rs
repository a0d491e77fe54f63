//! Native file-backed store.
//!
//! Writes hit disk immediately; the batch write workflow runs inside one
//! transaction, so a failed save leaves the previous graph image intact.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::StoreError;
use crate::graph::{CallGraph, Edge, Node};

use super::{reconstruct_graph, sql, GraphStore};

/// File-backed SQLite store.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref()).map_err(StoreError::Open)?;
        sql::ensure_schema(&conn).map_err(StoreError::Open)?;
        Ok(Self {
            conn,
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphStore for SqliteStore {
    fn save_graph(&mut self, graph: &CallGraph) -> Result<(), StoreError> {
        sql::write_graph(&mut self.conn, graph).map_err(StoreError::Write)
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
        // Durable already; nothing to flush.
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), StoreError> {
        let SqliteStore { conn, .. } = *self;
        conn.close().map_err(|(_, e)| StoreError::Write(e))
    }
}
