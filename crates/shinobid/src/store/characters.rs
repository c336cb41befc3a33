use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use crate::domain::{Character, CharacterPatch, ListQuery, NewCharacter, Page};

use super::{STORE_TARGET, Store, StoreError, contains_pattern, to_count, to_sql_int};

const FILTER: &str =
    "(?1 IS NULL OR name LIKE ?1 ESCAPE '\\' OR village LIKE ?1 ESCAPE '\\')";

impl Store {
    /// Inserts a character and returns it with its assigned id.
    pub fn create_character(&self, new: &NewCharacter) -> Result<Character, StoreError> {
        let connection = self.lock()?;
        connection.execute(
            "INSERT INTO characters (name, village, rank) VALUES (?1, ?2, ?3)",
            params![new.name, new.village, new.rank],
        )?;
        let character = Character {
            id: connection.last_insert_rowid(),
            name: new.name.clone(),
            village: new.village.clone(),
            rank: new.rank.clone(),
        };
        info!(target: STORE_TARGET, id = character.id, name = %character.name, "created character");
        Ok(character)
    }

    /// Lists characters ordered by id, optionally filtered by a substring of
    /// the name or village.
    pub fn list_characters(&self, query: &ListQuery) -> Result<Page<Character>, StoreError> {
        let connection = self.lock()?;
        let pattern = query.search.as_deref().map(contains_pattern);
        let total: i64 = connection.query_row(
            &format!("SELECT COUNT(*) FROM characters WHERE {FILTER}"),
            params![pattern],
            |row| row.get(0),
        )?;
        let mut statement = connection.prepare(&format!(
            "SELECT id, name, village, rank FROM characters WHERE {FILTER} \
             ORDER BY id LIMIT ?2 OFFSET ?3"
        ))?;
        let items = statement
            .query_map(
                params![
                    pattern,
                    i64::from(query.paging.size()),
                    to_sql_int(query.paging.offset())
                ],
                character_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, to_count(total), query.paging))
    }

    /// Fetches one character.
    pub fn get_character(&self, id: i64) -> Result<Option<Character>, StoreError> {
        let connection = self.lock()?;
        Ok(find_character(&connection, id)?)
    }

    /// Applies `patch`, returning the updated character or `None` when it
    /// does not exist.
    pub fn update_character(
        &self,
        id: i64,
        patch: &CharacterPatch,
    ) -> Result<Option<Character>, StoreError> {
        let connection = self.lock()?;
        let Some(current) = find_character(&connection, id)? else {
            return Ok(None);
        };
        let updated = Character {
            id,
            name: patch.name.clone().unwrap_or(current.name),
            village: patch.village.clone().unwrap_or(current.village),
            rank: patch.rank.clone().unwrap_or(current.rank),
        };
        connection.execute(
            "UPDATE characters SET name = ?2, village = ?3, rank = ?4 WHERE id = ?1",
            params![id, updated.name, updated.village, updated.rank],
        )?;
        info!(target: STORE_TARGET, id, "updated character");
        Ok(Some(updated))
    }

    /// Deletes a character; its jutsus are kept and detached. Returns
    /// `false` when nothing was deleted.
    pub fn delete_character(&self, id: i64) -> Result<bool, StoreError> {
        let connection = self.lock()?;
        let removed = connection.execute("DELETE FROM characters WHERE id = ?1", params![id])?;
        if removed > 0 {
            info!(target: STORE_TARGET, id, "deleted character");
        }
        Ok(removed > 0)
    }
}

pub(super) fn character_exists(connection: &Connection, id: i64) -> rusqlite::Result<bool> {
    connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM characters WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )
}

fn find_character(connection: &Connection, id: i64) -> rusqlite::Result<Option<Character>> {
    connection
        .query_row(
            "SELECT id, name, village, rank FROM characters WHERE id = ?1",
            params![id],
            character_from_row,
        )
        .optional()
}

fn character_from_row(row: &Row<'_>) -> rusqlite::Result<Character> {
    Ok(Character {
        id: row.get(0)?,
        name: row.get(1)?,
        village: row.get(2)?,
        rank: row.get(3)?,
    })
}
