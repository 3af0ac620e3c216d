use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::error::ApiError;
use super::state::AppState;
use crate::features::{
    ContentIdeas, Feature, FeatureKind, HashtagSet, NicheSearch, TitleBio, TrendAnalysis,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(|| async { StatusCode::OK }))
        .route(
            FeatureKind::NicheSearch.route(),
            post(generate_handler::<NicheSearch>),
        )
        .route(
            FeatureKind::TrendAnalysis.route(),
            post(generate_handler::<TrendAnalysis>),
        )
        .route(
            FeatureKind::HashtagSet.route(),
            post(generate_handler::<HashtagSet>),
        )
        .route(
            FeatureKind::ContentIdea.route(),
            post(generate_handler::<ContentIdeas>),
        )
        .route(
            FeatureKind::TitleBio.route(),
            post(generate_handler::<TitleBio>),
        )
}

/// One feature endpoint: every stage failure becomes a single JSON error.
#[instrument(skip_all, fields(feature = %F::KIND))]
pub async fn generate_handler<F: Feature>(
    State(state): State<AppState>,
    body: Result<Json<F::Request>, JsonRejection>,
) -> Result<Json<F::Output>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::invalid_body(F::KIND, rejection))?;
    state
        .generator
        .generate::<F>(&request)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_generation(F::KIND, err))
}
