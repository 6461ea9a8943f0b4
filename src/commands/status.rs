use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::store::count_rows;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = &args.db_path;
    info!(db_path = %db_path.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let docs_count = count_rows(&conn, "SELECT COUNT(*) FROM docs").unwrap_or(0);
    let chunks_count = count_rows(&conn, "SELECT COUNT(*) FROM chunks").unwrap_or(0);
    let failing_docs =
        count_rows(&conn, "SELECT COUNT(*) FROM docs WHERE quality_pass = 0").unwrap_or(0);
    let schema_version = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .unwrap_or_default();

    info!(
        path = %db_path.display(),
        schema_version = %schema_version,
        docs = docs_count,
        chunks = chunks_count,
        failing_quality = failing_docs,
        "database status"
    );

    Ok(())
}
