use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery},
    Extension, Json,
};
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::database::models::{Bootcamp, Course, CourseInput, Role};
use crate::database::schema::COURSE_BOOTCAMP;
use crate::database::DatabaseError;
use crate::error::{parse_id, ApiError};
use crate::filter::{advanced_results, CountedList, ListEnvelope, ListOptions, QueryParams};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

use super::{body, bootcamp_children, fetch_document};

const WRITERS: [Role; 2] = [Role::Publisher, Role::Admin];

async fn owned_course(state: &AppState, auth: &AuthUser, raw_id: &str) -> Result<Course, ApiError> {
    auth.authorize(&WRITERS)?;
    let id = parse_id(raw_id)?;
    let course = Course::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("Course", id))?;
    auth.ensure_owner(course.user_id)?;
    Ok(course)
}

/// GET /api/v1/courses
pub async fn list(
    Extension(state): Extension<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListEnvelope>, ApiError> {
    let params = QueryParams::parse(query.as_deref().unwrap_or_default());
    let envelope = advanced_results(&state.courses(), &params, Some(&COURSE_BOOTCAMP), &ListOptions::default()).await?;
    Ok(Json(envelope))
}

/// GET /api/v1/bootcamps/:id/courses
pub async fn for_bootcamp(
    Extension(state): Extension<AppState>,
    Path(bootcamp_id): Path<String>,
) -> Result<Json<CountedList>, ApiError> {
    let bootcamp_id = parse_id(&bootcamp_id)?;
    if Bootcamp::find_by_id(&state.pool, bootcamp_id).await?.is_none() {
        return Err(ApiError::resource_not_found("Bootcamp", bootcamp_id));
    }
    Ok(Json(bootcamp_children(&state.courses(), bootcamp_id).await?))
}

/// GET /api/v1/courses/:id
pub async fn show(Extension(state): Extension<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let course = fetch_document(&state.courses(), id, Some(&COURSE_BOOTCAMP)).await?;
    Ok(ApiResponse::success(course))
}

/// POST /api/v1/bootcamps/:id/courses - bootcamp owner or admin
pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(bootcamp_id): Path<String>,
    payload: Result<Json<CourseInput>, JsonRejection>,
) -> ApiResult<Value> {
    auth.authorize(&WRITERS)?;
    let bootcamp_id = parse_id(&bootcamp_id)?;
    let bootcamp = Bootcamp::find_by_id(&state.pool, bootcamp_id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("Bootcamp", bootcamp_id))?;
    auth.ensure_owner(bootcamp.user_id)?;

    let course = body(payload)?.validate_create()?;

    let mut tx = state.pool.begin().await.map_err(DatabaseError::from)?;
    let id = Course::insert(&mut *tx, bootcamp.id, auth.id(), &course).await?;
    Bootcamp::refresh_average_cost(&mut *tx, bootcamp.id).await?;
    tx.commit().await.map_err(DatabaseError::from)?;

    info!("Course {} added to bootcamp {}", id, bootcamp.id);
    let course = fetch_document(&state.courses(), id, None).await?;
    Ok(ApiResponse::created(course))
}

/// PUT /api/v1/courses/:id
pub async fn update(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<CourseInput>, JsonRejection>,
) -> ApiResult<Value> {
    let course = owned_course(&state, &auth, &id).await?;
    let changes = body(payload)?.validate_update()?;

    let mut tx = state.pool.begin().await.map_err(DatabaseError::from)?;
    Course::update(&mut *tx, course.id, &changes).await?;
    Bootcamp::refresh_average_cost(&mut *tx, course.bootcamp_id).await?;
    tx.commit().await.map_err(DatabaseError::from)?;

    let updated = fetch_document(&state.courses(), course.id, None).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/courses/:id
pub async fn delete(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let course = owned_course(&state, &auth, &id).await?;

    let mut tx = state.pool.begin().await.map_err(DatabaseError::from)?;
    Course::delete(&mut *tx, course.id).await?;
    Bootcamp::refresh_average_cost(&mut *tx, course.bootcamp_id).await?;
    tx.commit().await.map_err(DatabaseError::from)?;

    Ok(ApiResponse::message("Course Deleted Successfully."))
}
