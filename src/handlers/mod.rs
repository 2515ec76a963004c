// Route handlers, one module per resource. Routing lives in `app.rs`.

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod root;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use crate::database::schema::Populate;
use crate::database::Collection;
use crate::error::ApiError;
use crate::filter::{CountedList, FilterWhere};

/// Unwrap a JSON body, turning extractor rejections into the API error envelope
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(value) = payload?;
    Ok(value)
}

/// Load one document through the collection, or 404 with the resource name
pub(crate) async fn fetch_document<C>(
    collection: &C,
    id: Uuid,
    populate: Option<&'static Populate>,
) -> Result<Value, ApiError>
where
    C: Collection + ?Sized,
{
    collection
        .find_by_id(id, populate)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(collection.schema().resource, id))
}

/// Every document of a collection that belongs to one bootcamp, as `{success, count, data}`
pub(crate) async fn bootcamp_children<C>(collection: &C, bootcamp_id: Uuid) -> Result<CountedList, ApiError>
where
    C: Collection + ?Sized,
{
    let bootcamp_id = bootcamp_id.to_string();
    let filter = FilterWhere::parse(collection.schema(), [("bootcamp", bootcamp_id.as_str())])?;
    Ok(CountedList::new(collection.find_all(filter, None).await?))
}
