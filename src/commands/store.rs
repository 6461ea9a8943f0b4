use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::model::Chunk;
use crate::util::{ensure_directory, now_utc_string};

const DB_SCHEMA_VERSION: &str = "0.1.0";

pub struct StoredDocument<'a> {
    pub doc_id: &'a str,
    pub source_path: &'a str,
    pub sha256: &'a str,
    pub title: &'a str,
    pub structured: bool,
    pub article_count: usize,
    pub quality_pass: bool,
    pub chunks: &'a [Chunk],
}

/// `doc-` plus the first twelve hex digits of the input hash.
pub fn doc_id_for(sha256: &str) -> String {
    let prefix = sha256.get(..12).unwrap_or(sha256);
    format!("doc-{}", prefix)
}

pub fn chunk_id_for(doc_id: &str, chunk: &Chunk) -> String {
    let reference = chunk
        .metadata
        .kind
        .reference()
        .map(sanitize_ref_for_id)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "none".to_string());

    format!(
        "{}:{}:{}:{:04}",
        doc_id,
        chunk.chunk_type(),
        reference,
        chunk.metadata.section_order
    )
}

fn sanitize_ref_for_id(reference: &str) -> String {
    let mut out = String::with_capacity(reference.len());
    for ch in reference.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else {
            out.push('_');
        }
    }

    while out.contains("__") {
        out = out.replace("__", "_");
    }

    out.trim_matches('_').to_string()
}

pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let connection =
        Connection::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS docs (
              doc_id TEXT PRIMARY KEY,
              source_path TEXT NOT NULL,
              sha256 TEXT NOT NULL,
              title TEXT,
              structured INTEGER NOT NULL,
              article_count INTEGER NOT NULL DEFAULT 0,
              quality_pass INTEGER NOT NULL,
              processed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
              chunk_id TEXT PRIMARY KEY,
              doc_id TEXT NOT NULL,
              type TEXT NOT NULL,
              ref TEXT,
              boundary TEXT NOT NULL,
              section_order INTEGER NOT NULL,
              text TEXT NOT NULL,
              metadata_json TEXT NOT NULL,
              FOREIGN KEY(doc_id) REFERENCES docs(doc_id)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_doc_order ON chunks(doc_id, section_order);
            CREATE INDEX IF NOT EXISTS idx_chunks_doc_type ON chunks(doc_id, type);
            ",
        )
        .context("failed to initialize store schema")?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now_utc_string()],
    )?;

    Ok(())
}

/// Replaces the stored chunk set of one document inside a single transaction.
pub fn upsert_document(connection: &mut Connection, document: &StoredDocument<'_>) -> Result<usize> {
    let tx = connection.transaction()?;

    tx.execute(
        "
        INSERT INTO docs(doc_id, source_path, sha256, title, structured, article_count, quality_pass, processed_at)
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(doc_id) DO UPDATE SET
          source_path=excluded.source_path,
          sha256=excluded.sha256,
          title=excluded.title,
          structured=excluded.structured,
          article_count=excluded.article_count,
          quality_pass=excluded.quality_pass,
          processed_at=excluded.processed_at
        ",
        params![
            document.doc_id,
            document.source_path,
            document.sha256,
            document.title,
            document.structured,
            document.article_count as i64,
            document.quality_pass,
            now_utc_string(),
        ],
    )
    .with_context(|| format!("failed to upsert document {}", document.doc_id))?;

    tx.execute("DELETE FROM chunks WHERE doc_id = ?1", [document.doc_id])?;

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO chunks(chunk_id, doc_id, type, ref, boundary, section_order, text, metadata_json)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )?;

        for chunk in document.chunks {
            let metadata_json = serde_json::to_string(&chunk.metadata)
                .context("failed to serialize chunk metadata")?;
            let boundary = serde_json::to_value(chunk.metadata.boundary)
                .context("failed to serialize chunk boundary")?;
            statement.execute(params![
                chunk_id_for(document.doc_id, chunk),
                document.doc_id,
                chunk.chunk_type(),
                chunk.metadata.kind.reference(),
                boundary.as_str().unwrap_or_default(),
                chunk.metadata.section_order as i64,
                chunk.content,
                metadata_json,
            ])?;
        }
    }

    tx.commit()?;
    Ok(document.chunks.len())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
