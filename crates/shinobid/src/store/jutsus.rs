use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use crate::domain::{Jutsu, JutsuPatch, ListQuery, NewJutsu, Page};

use super::characters::character_exists;
use super::{STORE_TARGET, Store, StoreError, contains_pattern, to_count, to_sql_int};

const FILTER: &str = "(?1 IS NULL OR name LIKE ?1 ESCAPE '\\') AND (?2 IS NULL OR character_id = ?2)";

impl Store {
    /// Inserts a jutsu. Fails with [`StoreError::MissingCharacter`] when the
    /// referenced character does not exist.
    pub fn create_jutsu(&self, new: &NewJutsu) -> Result<Jutsu, StoreError> {
        let connection = self.lock()?;
        ensure_character(&connection, new.character_id)?;
        connection.execute(
            "INSERT INTO jutsus (name, jutsu_type, chakra_cost, character_id) \
             VALUES (?1, ?2, ?3, ?4)",
            params![new.name, new.kind, new.chakra_cost, new.character_id],
        )?;
        let jutsu = Jutsu {
            id: connection.last_insert_rowid(),
            name: new.name.clone(),
            kind: new.kind.clone(),
            chakra_cost: new.chakra_cost,
            character_id: new.character_id,
        };
        info!(
            target: STORE_TARGET,
            id = jutsu.id,
            name = %jutsu.name,
            character_id = ?jutsu.character_id,
            "created jutsu"
        );
        Ok(jutsu)
    }

    /// Lists jutsus ordered by id, filtered by name substring and owner.
    pub fn list_jutsus(&self, query: &ListQuery) -> Result<Page<Jutsu>, StoreError> {
        let connection = self.lock()?;
        let pattern = query.search.as_deref().map(contains_pattern);
        let total: i64 = connection.query_row(
            &format!("SELECT COUNT(*) FROM jutsus WHERE {FILTER}"),
            params![pattern, query.character_id],
            |row| row.get(0),
        )?;
        let mut statement = connection.prepare(&format!(
            "SELECT id, name, jutsu_type, chakra_cost, character_id FROM jutsus \
             WHERE {FILTER} ORDER BY id LIMIT ?3 OFFSET ?4"
        ))?;
        let items = statement
            .query_map(
                params![
                    pattern,
                    query.character_id,
                    i64::from(query.paging.size()),
                    to_sql_int(query.paging.offset())
                ],
                jutsu_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, to_count(total), query.paging))
    }

    /// Fetches one jutsu.
    pub fn get_jutsu(&self, id: i64) -> Result<Option<Jutsu>, StoreError> {
        let connection = self.lock()?;
        Ok(find_jutsu(&connection, id)?)
    }

    /// Applies `patch`. Returns `None` when the jutsu does not exist and
    /// [`StoreError::MissingCharacter`] when the new owner does not.
    pub fn update_jutsu(&self, id: i64, patch: &JutsuPatch) -> Result<Option<Jutsu>, StoreError> {
        let connection = self.lock()?;
        let Some(current) = find_jutsu(&connection, id)? else {
            return Ok(None);
        };
        if let Some(owner) = patch.character_id {
            ensure_character(&connection, owner)?;
        }
        let updated = Jutsu {
            id,
            name: patch.name.clone().unwrap_or(current.name),
            kind: patch.kind.clone().unwrap_or(current.kind),
            chakra_cost: patch.chakra_cost.unwrap_or(current.chakra_cost),
            character_id: patch.character_id.unwrap_or(current.character_id),
        };
        connection.execute(
            "UPDATE jutsus SET name = ?2, jutsu_type = ?3, chakra_cost = ?4, character_id = ?5 \
             WHERE id = ?1",
            params![
                id,
                updated.name,
                updated.kind,
                updated.chakra_cost,
                updated.character_id
            ],
        )?;
        info!(target: STORE_TARGET, id, "updated jutsu");
        Ok(Some(updated))
    }

    /// Deletes a jutsu. Returns `false` when nothing was deleted.
    pub fn delete_jutsu(&self, id: i64) -> Result<bool, StoreError> {
        let connection = self.lock()?;
        let removed = connection.execute("DELETE FROM jutsus WHERE id = ?1", params![id])?;
        if removed > 0 {
            info!(target: STORE_TARGET, id, "deleted jutsu");
        }
        Ok(removed > 0)
    }
}

fn ensure_character(connection: &Connection, owner: Option<i64>) -> Result<(), StoreError> {
    match owner {
        Some(id) if !character_exists(connection, id)? => Err(StoreError::MissingCharacter { id }),
        _ => Ok(()),
    }
}

fn find_jutsu(connection: &Connection, id: i64) -> rusqlite::Result<Option<Jutsu>> {
    connection
        .query_row(
            "SELECT id, name, jutsu_type, chakra_cost, character_id FROM jutsus WHERE id = ?1",
            params![id],
            jutsu_from_row,
        )
        .optional()
}

fn jutsu_from_row(row: &Row<'_>) -> rusqlite::Result<Jutsu> {
    Ok(Jutsu {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        chakra_cost: row.get(3)?,
        character_id: row.get(4)?,
    })
}
