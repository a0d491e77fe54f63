//! SQL shared by both store back-ends.
//!
//! The two back-ends differ only in where the connection lives (file vs
//! RAM) and how flushing works; every statement they run comes from here so
//! their on-disk images stay byte-compatible.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::StoreError;
use crate::graph::{CallGraph, Edge, EdgeKind, Meta, Node, NodeKind};

const SCHEMA: &str = "
CREATE TABLE nodes (
  id   TEXT PRIMARY KEY,
  type TEXT NOT NULL,
  label TEXT,
  meta TEXT
);
CREATE TABLE edges (
  id      INTEGER PRIMARY KEY AUTOINCREMENT,
  from_id TEXT NOT NULL,
  to_id   TEXT NOT NULL,
  type    TEXT NOT NULL,
  meta    TEXT,
  UNIQUE(from_id, to_id, type)
);
CREATE INDEX idx_nodes_type ON nodes(type);
CREATE INDEX idx_edges_from ON edges(from_id);
CREATE INDEX idx_edges_to   ON edges(to_id);
CREATE TABLE graph_info (
  key   TEXT PRIMARY KEY,
  value TEXT
);
";

/// Create the tables if this is a fresh database; leaves existing data
/// alone so read-only opens stay cheap.
pub(super) fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    let have_nodes: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'nodes'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if have_nodes.is_none() {
        conn.execute_batch(SCHEMA)?;
    }
    Ok(())
}

/// Drop and recreate everything. Only the write workflow calls this.
pub(super) fn reset_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS nodes;
         DROP TABLE IF EXISTS edges;
         DROP TABLE IF EXISTS graph_info;",
    )?;
    conn.execute_batch(SCHEMA)
}

/// The full write workflow: reset, upsert every node and edge, record the
/// source root, commit. The transaction rolls back on drop if any step
/// fails.
pub(super) fn write_graph(conn: &mut Connection, graph: &CallGraph) -> rusqlite::Result<()> {
    reset_schema(conn)?;

    let tx = conn.transaction()?;
    {
        let mut insert_node = tx.prepare(
            "INSERT INTO nodes (id, type, label, meta) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
               type = excluded.type, label = excluded.label, meta = excluded.meta",
        )?;
        for node in graph.nodes() {
            insert_node.execute((
                &node.id,
                node.kind.as_str(),
                node.label.as_deref(),
                node.meta.to_column(),
            ))?;
        }

        let mut insert_edge = tx.prepare(
            "INSERT INTO edges (from_id, to_id, type, meta) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(from_id, to_id, type) DO UPDATE SET meta = excluded.meta",
        )?;
        for edge in graph.edges() {
            insert_edge.execute((
                &edge.from,
                &edge.to,
                edge.kind.as_str(),
                edge.meta.to_column(),
            ))?;
        }

        tx.execute(
            "INSERT INTO graph_info (key, value) VALUES ('sourceRoot', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [graph.source_root()],
        )?;
    }
    tx.commit()
}

fn node_from_row(row: &Row<'_>) -> Result<Node, StoreError> {
    let id: String = row.get(0).map_err(StoreError::Read)?;
    let kind: String = row.get(1).map_err(StoreError::Read)?;
    let label: Option<String> = row.get(2).map_err(StoreError::Read)?;
    let meta: Option<String> = row.get(3).map_err(StoreError::Read)?;

    let kind = NodeKind::parse(&kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown node type `{kind}` on `{id}`")))?;
    Ok(Node::new(id, kind, label, Meta::from_column(meta.as_deref())))
}

fn edge_from_row(row: &Row<'_>) -> Result<Edge, StoreError> {
    let from: String = row.get(0).map_err(StoreError::Read)?;
    let to: String = row.get(1).map_err(StoreError::Read)?;
    let kind: String = row.get(2).map_err(StoreError::Read)?;
    let meta: Option<String> = row.get(3).map_err(StoreError::Read)?;

    let kind = EdgeKind::parse(&kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown edge type `{kind}`")))?;
    Ok(Edge::with_meta(from, to, kind, Meta::from_column(meta.as_deref())))
}

pub(super) fn get_node(conn: &Connection, id: &str) -> Result<Option<Node>, StoreError> {
    let mut stmt = conn
        .prepare_cached("SELECT id, type, label, meta FROM nodes WHERE id = ?1")
        .map_err(StoreError::Read)?;
    let mut rows = stmt.query([id]).map_err(StoreError::Read)?;
    match rows.next().map_err(StoreError::Read)? {
        Some(row) => Ok(Some(node_from_row(row)?)),
        None => Ok(None),
    }
}

pub(super) fn all_nodes(conn: &Connection) -> Result<Vec<Node>, StoreError> {
    let mut stmt = conn
        .prepare_cached("SELECT id, type, label, meta FROM nodes ORDER BY rowid")
        .map_err(StoreError::Read)?;
    collect_nodes(&mut stmt, [])
}

pub(super) fn all_edges(conn: &Connection) -> Result<Vec<Edge>, StoreError> {
    let mut stmt = conn
        .prepare_cached("SELECT from_id, to_id, type, meta FROM edges ORDER BY id")
        .map_err(StoreError::Read)?;
    collect_edges(&mut stmt, [])
}

/// Outgoing edges in insertion order, the order path enumeration walks.
pub(super) fn edges_from(conn: &Connection, id: &str) -> Result<Vec<Edge>, StoreError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT from_id, to_id, type, meta FROM edges WHERE from_id = ?1 ORDER BY id",
        )
        .map_err(StoreError::Read)?;
    collect_edges(&mut stmt, [id])
}

pub(super) fn edges_to(conn: &Connection, id: &str) -> Result<Vec<Edge>, StoreError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT from_id, to_id, type, meta FROM edges WHERE to_id = ?1 ORDER BY id",
        )
        .map_err(StoreError::Read)?;
    collect_edges(&mut stmt, [id])
}

/// Substring match on node ID or label (search stage one).
pub(super) fn find_by_id_or_label(
    conn: &Connection,
    query: &str,
    limit: u32,
) -> Result<Vec<Node>, StoreError> {
    let pattern = format!("%{}%", escape_like(query));
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, type, label, meta FROM nodes
             WHERE id LIKE ?1 ESCAPE '\\' OR label LIKE ?1 ESCAPE '\\'
             ORDER BY rowid LIMIT ?2",
        )
        .map_err(StoreError::Read)?;
    let mut rows = stmt
        .query(rusqlite::params![pattern, limit])
        .map_err(StoreError::Read)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(StoreError::Read)? {
        out.push(node_from_row(row)?);
    }
    Ok(out)
}

pub(super) fn source_root(conn: &Connection) -> Result<Option<String>, StoreError> {
    let mut stmt = conn
        .prepare_cached("SELECT value FROM graph_info WHERE key = 'sourceRoot'")
        .map_err(StoreError::Read)?;
    stmt.query_row([], |row| row.get(0))
        .optional()
        .map_err(StoreError::Read)
}

fn escape_like(q: &str) -> String {
    q.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn collect_nodes<P: rusqlite::Params>(
    stmt: &mut rusqlite::CachedStatement<'_>,
    params: P,
) -> Result<Vec<Node>, StoreError> {
    let mut rows = stmt.query(params).map_err(StoreError::Read)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(StoreError::Read)? {
        out.push(node_from_row(row)?);
    }
    Ok(out)
}

fn collect_edges<P: rusqlite::Params>(
    stmt: &mut rusqlite::CachedStatement<'_>,
    params: P,
) -> Result<Vec<Edge>, StoreError> {
    let mut rows = stmt.query(params).map_err(StoreError::Read)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(StoreError::Read)? {
        out.push(edge_from_row(row)?);
    }
    Ok(out)
}
