//! Records managed by the registry and the payloads that create or change them.

mod paging;
mod validation;

use serde::Serialize;
use serde_json::Value;

pub use paging::{ListQuery, Page, PageRequest};
pub use validation::{FieldError, FromJsonBody, TextLimits, ValidationErrors};

pub(crate) use validation::ObjectReader;

/// Bounds applied to names and villages.
pub const NAME_LIMITS: TextLimits = TextLimits::new(1, 100);
/// Bounds applied to character ranks.
pub const RANK_LIMITS: TextLimits = TextLimits::new(0, 50);
/// Bounds applied to jutsu types.
pub const JUTSU_TYPE_LIMITS: TextLimits = TextLimits::new(1, 50);

/// A stored character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Character {
    /// Identifier assigned by the store.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Home village.
    pub village: String,
    /// Optional rank, for example `Jonin`.
    pub rank: Option<String>,
}

/// Payload creating a character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCharacter {
    /// Display name.
    pub name: String,
    /// Home village.
    pub village: String,
    /// Optional rank.
    pub rank: Option<String>,
}

impl FromJsonBody for NewCharacter {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut reader = ObjectReader::new(value)?;
        let name = reader.required_text("name", NAME_LIMITS);
        let village = reader.required_text("village", NAME_LIMITS);
        let rank = reader.nullable_text("rank", RANK_LIMITS).flatten();
        reader.finish()?;
        Ok(Self {
            name,
            village,
            rank,
        })
    }
}

/// Partial update of a character; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterPatch {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement village.
    pub village: Option<String>,
    /// `Some(None)` clears the rank.
    pub rank: Option<Option<String>>,
}

impl FromJsonBody for CharacterPatch {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut reader = ObjectReader::new(value)?;
        let name = reader.optional_text("name", NAME_LIMITS);
        let village = reader.optional_text("village", NAME_LIMITS);
        let rank = reader.nullable_text("rank", RANK_LIMITS);
        reader.finish()?;
        Ok(Self {
            name,
            village,
            rank,
        })
    }
}

/// A stored technique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Jutsu {
    /// Identifier assigned by the store.
    pub id: i64,
    /// Technique name.
    pub name: String,
    /// Category such as `Ninjutsu` or `Taijutsu`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Chakra spent per use.
    pub chakra_cost: i64,
    /// Character the technique belongs to, if any.
    pub character_id: Option<i64>,
}

/// Payload creating a jutsu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJutsu {
    /// Technique name.
    pub name: String,
    /// Category.
    pub kind: String,
    /// Chakra spent per use.
    pub chakra_cost: i64,
    /// Owning character.
    pub character_id: Option<i64>,
}

impl NewJutsu {
    /// Returns the payload re-assigned to `character_id`.
    #[must_use]
    pub fn owned_by(self, character_id: i64) -> Self {
        Self {
            character_id: Some(character_id),
            ..self
        }
    }
}

impl FromJsonBody for NewJutsu {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut reader = ObjectReader::new(value)?;
        let name = reader.required_text("name", NAME_LIMITS);
        let kind = reader.required_text("type", JUTSU_TYPE_LIMITS);
        let chakra_cost = reader.required_integer("chakra_cost", 0);
        let character_id = reader.nullable_integer("character_id", 1).flatten();
        reader.finish()?;
        Ok(Self {
            name,
            kind,
            chakra_cost,
            character_id,
        })
    }
}

/// Partial update of a jutsu; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JutsuPatch {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement category.
    pub kind: Option<String>,
    /// Replacement cost.
    pub chakra_cost: Option<i64>,
    /// `Some(None)` detaches the technique from its character.
    pub character_id: Option<Option<i64>>,
}

impl FromJsonBody for JutsuPatch {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut reader = ObjectReader::new(value)?;
        let name = reader.optional_text("name", NAME_LIMITS);
        let kind = reader.optional_text("type", JUTSU_TYPE_LIMITS);
        let chakra_cost = reader.optional_integer("chakra_cost", 0);
        let character_id = reader.nullable_integer("character_id", 1);
        reader.finish()?;
        Ok(Self {
            name,
            kind,
            chakra_cost,
            character_id,
        })
    }
}

/// Parses a path segment as a record identifier (`>= 1`).
pub fn parse_id(field: &str, raw: &str) -> Result<i64, ValidationErrors> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationErrors::single(FieldError::unparsable_integer(field)))?;
    if id < 1 {
        return Err(ValidationErrors::single(FieldError::below_minimum(field, 1)));
    }
    Ok(id)
}
