use crate::models::db_operations::content_db_operations;
use crate::models::{DeletedSubtree, Item, ItemContent, ItemId, Section, SectionId};
use crate::DbPool;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Section {0} not found")]
    SectionNotFound(SectionId),
    #[error("Section name must not be empty")]
    EmptyName,
}

/// Read and write access to the section/item tree.
///
/// Implementations must keep the parent graph a forest, refuse to attach
/// sections or items to missing sections, and apply each write atomically.
pub trait ContentStore: Send + Sync {
    fn get_section(&self, id: SectionId) -> Result<Option<Section>, StoreError>;

    /// Ordered children of `parent`; `None` lists the top level.
    fn get_children(&self, parent: Option<SectionId>) -> Result<Vec<Section>, StoreError>;

    fn get_items(&self, section_id: SectionId) -> Result<Vec<Item>, StoreError>;

    fn create_section(&self, name: &str, parent: Option<SectionId>) -> Result<SectionId, StoreError>;

    fn rename_section(&self, id: SectionId, name: &str) -> Result<(), StoreError>;

    fn delete_section_cascade(&self, id: SectionId) -> Result<DeletedSubtree, StoreError>;

    fn create_item(&self, section_id: SectionId, content: &ItemContent) -> Result<ItemId, StoreError>;
}

pub struct SqliteContentStore {
    pool: DbPool,
}

impl SqliteContentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        self.pool.get().map_err(StoreError::Pool)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn checked_name(name: &str) -> Result<&str, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::EmptyName);
    }
    Ok(name)
}

impl ContentStore for SqliteContentStore {
    fn get_section(&self, id: SectionId) -> Result<Option<Section>, StoreError> {
        let conn = self.get_conn()?;
        Ok(content_db_operations::read_section(&conn, id)?)
    }

    fn get_children(&self, parent: Option<SectionId>) -> Result<Vec<Section>, StoreError> {
        let conn = self.get_conn()?;
        Ok(content_db_operations::read_child_sections(&conn, parent)?)
    }

    fn get_items(&self, section_id: SectionId) -> Result<Vec<Item>, StoreError> {
        let conn = self.get_conn()?;
        Ok(content_db_operations::read_items(&conn, section_id)?)
    }

    fn create_section(&self, name: &str, parent: Option<SectionId>) -> Result<SectionId, StoreError> {
        let name = checked_name(name)?;
        let mut conn = self.get_conn()?;
        match content_db_operations::insert_section(&mut conn, name, parent)? {
            Some(id) => Ok(id),
            // insert_section only reports a missing parent
            None => Err(StoreError::SectionNotFound(parent.unwrap_or_default())),
        }
    }

    fn rename_section(&self, id: SectionId, name: &str) -> Result<(), StoreError> {
        let name = checked_name(name)?;
        let conn = self.get_conn()?;
        match content_db_operations::update_section_name(&conn, id, name)? {
            0 => Err(StoreError::SectionNotFound(id)),
            _ => Ok(()),
        }
    }

    fn delete_section_cascade(&self, id: SectionId) -> Result<DeletedSubtree, StoreError> {
        let mut conn = self.get_conn()?;
        content_db_operations::delete_section_tree(&mut conn, id)?
            .ok_or(StoreError::SectionNotFound(id))
    }

    fn create_item(&self, section_id: SectionId, content: &ItemContent) -> Result<ItemId, StoreError> {
        let mut conn = self.get_conn()?;
        content_db_operations::insert_item(&mut conn, section_id, content)?
            .ok_or(StoreError::SectionNotFound(section_id))
    }
}

/// Single-connection in-memory store; every pooled checkout sees the same database.
#[cfg(test)]
pub(crate) fn in_memory_store() -> SqliteContentStore {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = r2d2::Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("in-memory pool");
    {
        let mut conn = pool.get().expect("in-memory connection");
        crate::setup::db_setup::setup_content_db(&mut conn).expect("schema");
    }
    SqliteContentStore::new(pool)
}
