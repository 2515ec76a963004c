use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery},
    Extension, Json,
};
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::database::models::{Bootcamp, Review, ReviewInput, Role};
use crate::database::schema::REVIEW_BOOTCAMP;
use crate::database::DatabaseError;
use crate::error::{parse_id, ApiError};
use crate::filter::{advanced_results, CountedList, ListEnvelope, ListOptions, QueryParams};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

use super::{body, bootcamp_children, fetch_document};

const REVIEWERS: [Role; 2] = [Role::User, Role::Admin];

async fn owned_review(state: &AppState, auth: &AuthUser, raw_id: &str) -> Result<Review, ApiError> {
    auth.authorize(&REVIEWERS)?;
    let id = parse_id(raw_id)?;
    let review = Review::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("Review", id))?;
    auth.ensure_owner(review.user_id)?;
    Ok(review)
}

/// GET /api/v1/reviews
pub async fn list(
    Extension(state): Extension<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListEnvelope>, ApiError> {
    let params = QueryParams::parse(query.as_deref().unwrap_or_default());
    let envelope = advanced_results(&state.reviews(), &params, Some(&REVIEW_BOOTCAMP), &ListOptions::default()).await?;
    Ok(Json(envelope))
}

/// GET /api/v1/bootcamps/:id/reviews
pub async fn for_bootcamp(
    Extension(state): Extension<AppState>,
    Path(bootcamp_id): Path<String>,
) -> Result<Json<CountedList>, ApiError> {
    let bootcamp_id = parse_id(&bootcamp_id)?;
    if Bootcamp::find_by_id(&state.pool, bootcamp_id).await?.is_none() {
        return Err(ApiError::resource_not_found("Bootcamp", bootcamp_id));
    }
    Ok(Json(bootcamp_children(&state.reviews(), bootcamp_id).await?))
}

/// GET /api/v1/reviews/:id
pub async fn show(Extension(state): Extension<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let review = fetch_document(&state.reviews(), id, Some(&REVIEW_BOOTCAMP)).await?;
    Ok(ApiResponse::success(review))
}

/// POST /api/v1/bootcamps/:id/reviews - one review per user and bootcamp
pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(bootcamp_id): Path<String>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> ApiResult<Value> {
    auth.authorize(&REVIEWERS)?;
    let bootcamp_id = parse_id(&bootcamp_id)?;
    let bootcamp = Bootcamp::find_by_id(&state.pool, bootcamp_id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("Bootcamp", bootcamp_id))?;

    if Review::exists_for(&state.pool, bootcamp.id, auth.id()).await? {
        return Err(ApiError::bad_request(format!(
            "user id: {} has already left a review on this bootcamp.",
            auth.id()
        )));
    }

    let review = body(payload)?.validate_create()?;

    // The unique (bootcamp, user) index still guards a concurrent double post
    let mut tx = state.pool.begin().await.map_err(DatabaseError::from)?;
    let id = Review::insert(&mut *tx, bootcamp.id, auth.id(), &review).await?;
    Bootcamp::refresh_average_rating(&mut *tx, bootcamp.id).await?;
    tx.commit().await.map_err(DatabaseError::from)?;

    info!("Review {} left on bootcamp {}", id, bootcamp.id);
    let review = fetch_document(&state.reviews(), id, None).await?;
    Ok(ApiResponse::created(review))
}

/// PUT /api/v1/reviews/:id
pub async fn update(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> ApiResult<Value> {
    let review = owned_review(&state, &auth, &id).await?;
    let changes = body(payload)?.validate_update()?;

    let mut tx = state.pool.begin().await.map_err(DatabaseError::from)?;
    Review::update(&mut *tx, review.id, &changes).await?;
    Bootcamp::refresh_average_rating(&mut *tx, review.bootcamp_id).await?;
    tx.commit().await.map_err(DatabaseError::from)?;

    let updated = fetch_document(&state.reviews(), review.id, None).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/reviews/:id
pub async fn delete(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let review = owned_review(&state, &auth, &id).await?;

    let mut tx = state.pool.begin().await.map_err(DatabaseError::from)?;
    Review::delete(&mut *tx, review.id).await?;
    Bootcamp::refresh_average_rating(&mut *tx, review.bootcamp_id).await?;
    tx.commit().await.map_err(DatabaseError::from)?;

    Ok(ApiResponse::message("Review Deleted Successfully."))
}
