use crate::models::{
    DeletedSubtree, Item, ItemContent, ItemId, ItemKind, Section, SectionId,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};

const SECTION_COLUMNS: &str = "id, name, parent_id, position";
const ITEM_COLUMNS: &str = "id, section_id, type, text, file_id, caption, position";

// Every section id reachable from ?1, ?1 included.
const SUBTREE_CTE: &str = "WITH RECURSIVE subtree(id) AS (
        SELECT id FROM sections WHERE id = ?1
        UNION ALL
        SELECT s.id FROM sections s JOIN subtree t ON s.parent_id = t.id
    )";

fn section_from_row(row: &Row) -> Result<Section, RusqliteError> {
    Ok(Section {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        position: row.get(3)?,
    })
}

fn item_from_row(row: &Row) -> Result<Item, RusqliteError> {
    let kind_str: String = row.get(2)?;
    let kind: ItemKind = kind_str
        .parse()
        .map_err(|e| RusqliteError::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    let content = match kind.media() {
        None => ItemContent::Text {
            body: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        },
        Some(media) => ItemContent::Media {
            media,
            file_id: row.get(4)?,
            caption: row.get(5)?,
        },
    };

    Ok(Item {
        id: row.get(0)?,
        section_id: row.get(1)?,
        content,
        position: row.get(6)?,
    })
}

pub fn read_section(conn: &Connection, section_id: SectionId) -> Result<Option<Section>, RusqliteError> {
    conn.query_row(
        &format!("SELECT {} FROM sections WHERE id = ?1", SECTION_COLUMNS),
        [section_id],
        section_from_row,
    )
    .optional()
}

pub fn section_exists(conn: &Connection, section_id: SectionId) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sections WHERE id = ?1)",
        [section_id],
        |row| row.get(0),
    )
}

/// Child sections of `parent_id` (top level when `None`), ordered by position then id.
pub fn read_child_sections(
    conn: &Connection,
    parent_id: Option<SectionId>,
) -> Result<Vec<Section>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM sections WHERE parent_id IS ?1 ORDER BY position, id",
        SECTION_COLUMNS
    ))?;
    let rows = stmt.query_map(params![parent_id], section_from_row)?;

    let mut sections = Vec::new();
    for section in rows {
        sections.push(section?);
    }
    Ok(sections)
}

pub fn read_items(conn: &Connection, section_id: SectionId) -> Result<Vec<Item>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM items WHERE section_id = ?1 ORDER BY position, id",
        ITEM_COLUMNS
    ))?;
    let rows = stmt.query_map([section_id], item_from_row)?;

    let mut items = Vec::new();
    for item in rows {
        items.push(item?);
    }
    Ok(items)
}

/// Inserts a section after its last sibling. Returns `None` when the parent is gone.
pub fn insert_section(
    conn: &mut Connection,
    name: &str,
    parent_id: Option<SectionId>,
) -> Result<Option<SectionId>, RusqliteError> {
    let tx = conn.transaction()?;

    if let Some(parent) = parent_id {
        if !section_exists(&tx, parent)? {
            return Ok(None);
        }
    }

    let position: i64 = tx.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM sections WHERE parent_id IS ?1",
        params![parent_id],
        |row| row.get(0),
    )?;
    tx.execute(
        "INSERT INTO sections (name, parent_id, position) VALUES (?1, ?2, ?3)",
        params![name, parent_id, position],
    )?;
    let id = tx.last_insert_rowid();

    tx.commit()?;
    SectionId::try_from(id)
        .map(Some)
        .map_err(|_| RusqliteError::IntegralValueOutOfRange(0, id))
}

pub fn update_section_name(
    conn: &Connection,
    section_id: SectionId,
    name: &str,
) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE sections SET name = ?1 WHERE id = ?2",
        params![name, section_id],
    )
}

/// Deletes a section, all of its descendants and every item they own, in one
/// transaction. Returns `None` when the section does not exist.
pub fn delete_section_tree(
    conn: &mut Connection,
    section_id: SectionId,
) -> Result<Option<DeletedSubtree>, RusqliteError> {
    let tx = conn.transaction()?;

    if !section_exists(&tx, section_id)? {
        return Ok(None);
    }

    // Cascaded child rows are not reported by changes(), so count up front.
    let sections: i64 = tx.query_row(
        &format!("{} SELECT COUNT(*) FROM subtree", SUBTREE_CTE),
        [section_id],
        |row| row.get(0),
    )?;
    let items = tx.execute(
        &format!(
            "{} DELETE FROM items WHERE section_id IN (SELECT id FROM subtree)",
            SUBTREE_CTE
        ),
        [section_id],
    )?;
    tx.execute(
        &format!(
            "{} DELETE FROM sections WHERE id IN (SELECT id FROM subtree)",
            SUBTREE_CTE
        ),
        [section_id],
    )?;

    tx.commit()?;
    Ok(Some(DeletedSubtree {
        sections: sections as usize,
        items,
    }))
}

/// Appends an item to a section. Returns `None` when the section is gone.
pub fn insert_item(
    conn: &mut Connection,
    section_id: SectionId,
    content: &ItemContent,
) -> Result<Option<ItemId>, RusqliteError> {
    let tx = conn.transaction()?;

    if !section_exists(&tx, section_id)? {
        return Ok(None);
    }

    let position: i64 = tx.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM items WHERE section_id = ?1",
        [section_id],
        |row| row.get(0),
    )?;

    let (text, file_id, caption) = match content {
        ItemContent::Text { body } => (Some(body.as_str()), None, None),
        ItemContent::Media { file_id, caption, .. } => {
            (None, Some(file_id.as_str()), caption.as_deref())
        }
    };
    tx.execute(
        "INSERT INTO items (section_id, type, text, file_id, caption, position) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![section_id, content.kind().as_str(), text, file_id, caption, position],
    )?;
    let id = tx.last_insert_rowid();

    tx.commit()?;
    ItemId::try_from(id)
        .map(Some)
        .map_err(|_| RusqliteError::IntegralValueOutOfRange(0, id))
}
