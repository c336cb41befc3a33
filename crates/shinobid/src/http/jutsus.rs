use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::domain::{Jutsu, JutsuPatch, ListQuery, NewJutsu, Page, parse_id};
use crate::store::StoreError;

use super::errors::ApiError;
use super::{AppState, parse_body, store_failure};

const ID_FIELD: &str = "jutsu_id";
const NOT_FOUND: &str = "Jutsu not found";

pub(super) async fn create(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Jutsu>), ApiError> {
    let new: NewJutsu = parse_body(&body)?;
    // An unknown owner is reported as a generic creation failure.
    let created = state
        .run(move |store| store.create_jutsu(&new))
        .await?
        .map_err(|error| store_failure(&error, ApiError::bad_request("Could not create jutsu")))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Jutsu>>, ApiError> {
    let query = ListQuery::from_params(&params)?;
    let page = state
        .run(move |store| store.list_jutsus(&query))
        .await?
        .map_err(|error| store_failure(&error, ApiError::internal("Error retrieving jutsus")))?;
    Ok(Json(page))
}

pub(super) async fn show(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Jutsu>, ApiError> {
    let id = parse_id(ID_FIELD, &raw_id)?;
    state
        .run(move |store| store.get_jutsu(id))
        .await?
        .map_err(|error| store_failure(&error, ApiError::internal("Error retrieving jutsu")))?
        .map(Json)
        .ok_or(ApiError::not_found(NOT_FOUND))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<Jutsu>, ApiError> {
    let id = parse_id(ID_FIELD, &raw_id)?;
    let patch: JutsuPatch = parse_body(&body)?;
    state
        .run(move |store| store.update_jutsu(id, &patch))
        .await?
        .map_err(|error| match error {
            StoreError::MissingCharacter { .. } => ApiError::not_found("Character not found"),
            other => store_failure(&other, ApiError::bad_request("Could not update jutsu")),
        })?
        .map(Json)
        .ok_or(ApiError::not_found(NOT_FOUND))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(ID_FIELD, &raw_id)?;
    let removed = state
        .run(move |store| store.delete_jutsu(id))
        .await?
        .map_err(|error| store_failure(&error, ApiError::internal("Could not delete jutsu")))?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(NOT_FOUND))
    }
}
