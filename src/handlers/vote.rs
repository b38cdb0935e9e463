use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{AppState, blocking};
use crate::error::AppError;
use crate::models::{LanguageCode, Selection};
use crate::voting::apply_selections;
use crate::wordcloud::BatchPolicy;

pub const RESULTS_PAGE: &str = "/wordcloud";

#[derive(Debug, Deserialize)]
pub struct VotePayload {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegeneratePayload {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub redirect: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegenerateResponse {
    pub image_path: String,
}

// Records the vote, then redraws every language from the new tally.
// The vote is already on disk when rendering starts, so a failed language
// is logged and skipped rather than failing the submission.
pub async fn submit_vote(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VotePayload>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let Json(payload) = payload?;
    let selection = Selection::new(payload.items.as_slice())?;

    let record = blocking(move || {
        let record = state.store.apply(&selection)?;
        state.renderer.render_all(&record, BatchPolicy::LogAndContinue)?;
        Ok(record)
    })
    .await?;

    info!("Vote accepted, {} submissions so far", record.total);
    Ok(Json(SubmitResponse {
        success: true,
        redirect: RESULTS_PAGE.to_string(),
    }))
}

// Draws the cloud as it would look with this selection added, without saving it.
pub async fn preview_wordcloud(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VotePayload>, JsonRejection>,
) -> Result<Json<PreviewResponse>, AppError> {
    let Json(payload) = payload?;
    let selection = Selection::new(payload.items.as_slice())?;
    debug!("Preview requested from language {:?}", payload.language);

    blocking(move || {
        let hypothetical = apply_selections(&state.store.load(), &selection);
        state.renderer.render_all(&hypothetical, BatchPolicy::StopOnError)?;
        Ok(())
    })
    .await?;

    Ok(Json(PreviewResponse { success: true }))
}

pub async fn regenerate_wordcloud(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegeneratePayload>, JsonRejection>,
) -> Result<Json<RegenerateResponse>, AppError> {
    let Json(payload) = payload?;
    let language = match payload.language.as_deref() {
        Some(raw) => LanguageCode::parse(raw)?,
        None => LanguageCode::default_language(),
    };

    let worker_state = Arc::clone(&state);
    let worker_language = language.clone();
    blocking(move || {
        let record = worker_state.store.load();
        worker_state.renderer.render(&record, &worker_language)?;
        Ok(())
    })
    .await?;

    Ok(Json(RegenerateResponse {
        image_path: state.renderer.image_url(&language, Utc::now().timestamp()),
    }))
}
