use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::domain::{
    Character, CharacterPatch, Jutsu, ListQuery, NewCharacter, NewJutsu, Page, parse_id,
};
use crate::store::StoreError;

use super::errors::ApiError;
use super::{AppState, parse_body, store_failure};

const ID_FIELD: &str = "character_id";
const NOT_FOUND: &str = "Character not found";

pub(super) async fn create(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Character>), ApiError> {
    let new: NewCharacter = parse_body(&body)?;
    let created = state
        .run(move |store| store.create_character(&new))
        .await?
        .map_err(|error| store_failure(&error, ApiError::bad_request("Could not create character")))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Character>>, ApiError> {
    let query = ListQuery::from_params(&params)?;
    let page = state
        .run(move |store| store.list_characters(&query))
        .await?
        .map_err(|error| store_failure(&error, ApiError::internal("Error retrieving characters")))?;
    Ok(Json(page))
}

pub(super) async fn show(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Character>, ApiError> {
    let id = parse_id(ID_FIELD, &raw_id)?;
    state
        .run(move |store| store.get_character(id))
        .await?
        .map_err(|error| store_failure(&error, ApiError::internal("Error retrieving character")))?
        .map(Json)
        .ok_or(ApiError::not_found(NOT_FOUND))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<Character>, ApiError> {
    let id = parse_id(ID_FIELD, &raw_id)?;
    let patch: CharacterPatch = parse_body(&body)?;
    state
        .run(move |store| store.update_character(id, &patch))
        .await?
        .map_err(|error| store_failure(&error, ApiError::bad_request("Could not update character")))?
        .map(Json)
        .ok_or(ApiError::not_found(NOT_FOUND))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(ID_FIELD, &raw_id)?;
    let removed = state
        .run(move |store| store.delete_character(id))
        .await?
        .map_err(|error| store_failure(&error, ApiError::internal("Could not delete character")))?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(NOT_FOUND))
    }
}

pub(super) async fn add_jutsu(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Jutsu>), ApiError> {
    let id = parse_id(ID_FIELD, &raw_id)?;
    let new: NewJutsu = parse_body(&body)?;
    let created = state
        .run(move |store| store.create_jutsu(&new.owned_by(id)))
        .await?
        .map_err(|error| match error {
            StoreError::MissingCharacter { .. } => ApiError::not_found(NOT_FOUND),
            other => store_failure(
                &other,
                ApiError::bad_request("Could not add jutsu to character"),
            ),
        })?;
    Ok((StatusCode::CREATED, Json(created)))
}
