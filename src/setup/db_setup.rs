use rusqlite::Connection;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Creates the content tables if they are missing. Safe to run on every start.
pub fn setup_content_db(conn: &mut Connection) -> Result<(), SetupError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    let tx = conn.transaction()?;

    log::info!("- Creating 'sections' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS sections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(trim(name)) > 0),
            parent_id INTEGER NULL REFERENCES sections(id) ON DELETE CASCADE,
            position INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // A text row carries a body and no media reference; every other kind the reverse.
    log::info!("- Creating 'items' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            section_id INTEGER NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
            type TEXT NOT NULL CHECK (type IN ('text','photo','document','video','audio','animation')),
            text TEXT,
            file_id TEXT,
            caption TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            CHECK ((type = 'text') = (text IS NOT NULL)),
            CHECK ((type = 'text') = (file_id IS NULL))
        )",
        [],
    )?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_sections_parent ON sections(parent_id)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_items_section ON items(section_id)",
        [],
    )?;

    tx.commit()?;
    Ok(())
}

/// Opens (creating directory and file as needed) the content database and
/// brings its schema up to date.
pub fn open_content_db(db_path: &Path) -> Result<Connection, SetupError> {
    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir)?;
    }
    let mut conn = Connection::open(db_path)?;
    setup_content_db(&mut conn)?;
    Ok(conn)
}
