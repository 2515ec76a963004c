use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        Path, RawQuery,
    },
    Extension, Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::app::AppState;
use crate::database::models::{Bootcamp, BootcampInput, Role};
use crate::database::schema::{BOOTCAMP_COURSES, BOOTCAMP_COURSE_SUMMARIES};
use crate::database::{Collection, DatabaseError};
use crate::error::{parse_id, ApiError};
use crate::filter::{advanced_results, CountedList, FilterExpr, GeoWithin, ListEnvelope, ListOptions, QueryParams};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::photos::DEFAULT_PHOTO;
use crate::services::PhotoStore;

use super::{body, fetch_document};

const WRITERS: [Role; 2] = [Role::Publisher, Role::Admin];

#[derive(Debug, Serialize)]
pub struct PhotoUploaded {
    pub file_name: String,
}

/// Load a bootcamp and check the caller may change it
async fn owned_bootcamp(state: &AppState, auth: &AuthUser, raw_id: &str) -> Result<Bootcamp, ApiError> {
    auth.authorize(&WRITERS)?;
    let id = parse_id(raw_id)?;
    let bootcamp = Bootcamp::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("Bootcamp", id))?;
    auth.ensure_owner(bootcamp.user_id)?;
    Ok(bootcamp)
}

/// GET /api/v1/bootcamps
pub async fn list(
    Extension(state): Extension<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListEnvelope>, ApiError> {
    let params = QueryParams::parse(query.as_deref().unwrap_or_default());
    let envelope = advanced_results(&state.bootcamps(), &params, Some(&BOOTCAMP_COURSES), &ListOptions::default()).await?;
    Ok(Json(envelope))
}

/// GET /api/v1/bootcamps/:id
pub async fn show(Extension(state): Extension<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let bootcamp = fetch_document(&state.bootcamps(), id, Some(&BOOTCAMP_COURSE_SUMMARIES)).await?;
    Ok(ApiResponse::success(bootcamp))
}

/// POST /api/v1/bootcamps
pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<BootcampInput>, JsonRejection>,
) -> ApiResult<Value> {
    auth.authorize(&WRITERS)?;
    let input = body(payload)?.validate_create()?;

    let location = match input.address.as_deref() {
        Some(address) => state.geocoder.geocode(address).await?,
        None => None,
    };

    let id = Bootcamp::insert(&state.pool, &input, auth.id(), location.as_ref()).await?;
    info!("Bootcamp {} created by {}", id, auth.id());

    let bootcamp = fetch_document(&state.bootcamps(), id, None).await?;
    Ok(ApiResponse::created(bootcamp))
}

/// PUT /api/v1/bootcamps/:id
pub async fn update(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<BootcampInput>, JsonRejection>,
) -> ApiResult<Value> {
    let bootcamp = owned_bootcamp(&state, &auth, &id).await?;
    let input = body(payload)?.validate_update()?;

    // Only a changed address is geocoded again
    let new_address = input.address.as_deref().filter(|a| *a != bootcamp.address);
    let relocated = match new_address {
        Some(address) => Some(state.geocoder.geocode(address).await?),
        None => None,
    };

    let mut tx = state.pool.begin().await.map_err(DatabaseError::from)?;
    Bootcamp::update(&mut *tx, bootcamp.id, &input).await?;
    if let Some(location) = &relocated {
        Bootcamp::set_location(&mut *tx, bootcamp.id, location.as_ref()).await?;
    }
    tx.commit().await.map_err(DatabaseError::from)?;

    let updated = fetch_document(&state.bootcamps(), bootcamp.id, None).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/bootcamps/:id - courses and reviews go with it
pub async fn delete(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let bootcamp = owned_bootcamp(&state, &auth, &id).await?;
    Bootcamp::delete(&state.pool, bootcamp.id).await?;

    if bootcamp.photo != DEFAULT_PHOTO {
        if let Err(e) = state.photos.remove(&bootcamp.photo).await {
            warn!("Could not remove photo {} of deleted bootcamp: {}", bootcamp.photo, e);
        }
    }

    info!("Bootcamp {} deleted by {}", bootcamp.id, auth.id());
    Ok(ApiResponse::message("Bootcamp Deleted Successfully."))
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance - distance in miles
pub async fn within_radius(
    Extension(state): Extension<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<Json<CountedList>, ApiError> {
    let radius_miles = distance
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid distance: {}", distance)))?;

    let location = state
        .geocoder
        .geocode(&zipcode)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No location found for zipcode {}", zipcode)))?;

    let filter = FilterExpr::new().within(GeoWithin {
        longitude: location.longitude,
        latitude: location.latitude,
        radius_miles,
    });
    let bootcamps = state.bootcamps().find_all(filter, None).await?;
    Ok(Json(CountedList::new(bootcamps)))
}

/// PUT /api/v1/bootcamps/:id/photo - multipart field `file`
pub async fn upload_photo(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<PhotoUploaded> {
    let bootcamp = owned_bootcamp(&state, &auth, &id).await?;
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let original_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
        upload = Some((content_type, original_name, bytes));
        break;
    }

    let (content_type, original_name, bytes) =
        upload.ok_or_else(|| ApiError::bad_request("No file was uploaded."))?;
    state.photos.check(content_type.as_deref(), bytes.len())?;

    let file_name = PhotoStore::file_name_for(bootcamp.id, original_name.as_deref());
    state.photos.save(&file_name, &bytes).await?;
    Bootcamp::set_photo(&state.pool, bootcamp.id, &file_name).await?;

    if bootcamp.photo != DEFAULT_PHOTO && bootcamp.photo != file_name {
        state.photos.remove(&bootcamp.photo).await?;
    }

    Ok(ApiResponse::success(PhotoUploaded { file_name }))
}

/// DELETE /api/v1/bootcamps/:id/photo
pub async fn delete_photo(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let bootcamp = owned_bootcamp(&state, &auth, &id).await?;
    if bootcamp.photo == DEFAULT_PHOTO {
        return Err(ApiError::not_found("No photo found for this bootcamp"));
    }

    state.photos.remove(&bootcamp.photo).await?;
    Bootcamp::set_photo(&state.pool, bootcamp.id, DEFAULT_PHOTO).await?;
    Ok(ApiResponse::message("Photo deleted successfully."))
}
