//! Request handlers for the phrase endpoints.

use crate::ApiState;
use crate::helpers::{ApiError, ApiResult, json_body_error, ranker_error};
use chrono::{DateTime, Utc};
use phrase_ranker_common::service;
use phrase_ranker_common::{
    ComparisonData, ComparisonResultData, MessageData, NewPhraseData, PhraseData, StoreHealth,
};
use rocket::State;
use rocket::http::Status;
use rocket::response::status as rocket_status;
use rocket::serde::json::{Error as JsonError, Json};
use rocket::serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthData {
    message: String,
    timestamp: DateTime<Utc>,
    env: &'static str,
    database: StoreHealth,
}

#[get("/")]
pub fn index() -> Json<MessageData> {
    Json(MessageData {
        message: "Phrase Ranker API is running".to_string(),
    })
}

#[get("/api/test")]
pub fn test_connection(state: &State<ApiState>) -> ApiResult<HealthData> {
    let database = state
        .store
        .health_check()
        .map_err(|e| ranker_error(e, &state.config))?;
    tracing::debug!(tables = ?database.tables, "Database test query successful");

    Ok(Json(HealthData {
        message: "API and database are working".to_string(),
        timestamp: Utc::now(),
        env: state.config.app_env.as_str(),
        database,
    }))
}

#[get("/api/phrases/compare")]
pub fn get_pair(state: &State<ApiState>) -> ApiResult<Vec<PhraseData>> {
    let pair = service::compare_random_pair(state.store.as_ref())
        .map_err(|e| ranker_error(e, &state.config))?;
    Ok(Json(pair.into_iter().map(PhraseData::from).collect()))
}

#[post("/api/phrases", data = "<data>")]
pub fn create_phrase(
    state: &State<ApiState>,
    data: Result<Json<NewPhraseData>, JsonError<'_>>,
) -> Result<rocket_status::Custom<Json<PhraseData>>, ApiError> {
    let data = data.map_err(|e| json_body_error(&e))?;
    let record = service::submit_phrase(state.store.as_ref(), data.text.as_deref())
        .map_err(|e| ranker_error(e, &state.config))?;
    Ok(rocket_status::Custom(
        Status::Created,
        Json(PhraseData::from(record)),
    ))
}

#[post("/api/phrases/compare", data = "<data>")]
pub fn submit_comparison(
    state: &State<ApiState>,
    data: Result<Json<ComparisonData>, JsonError<'_>>,
) -> ApiResult<ComparisonResultData> {
    let data = data.map_err(|e| json_body_error(&e))?;
    let outcome = service::submit_comparison(state.store.as_ref(), &data)
        .map_err(|e| ranker_error(e, &state.config))?;
    Ok(Json(ComparisonResultData::from(outcome)))
}

#[get("/api/phrases/ranked")]
pub fn get_ranked(state: &State<ApiState>) -> ApiResult<Vec<PhraseData>> {
    let phrases =
        service::list_ranked(state.store.as_ref()).map_err(|e| ranker_error(e, &state.config))?;
    Ok(Json(phrases.into_iter().map(PhraseData::from).collect()))
}

/// Answer CORS preflight requests; the CORS fairing adds the headers.
#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::NoContent
}
