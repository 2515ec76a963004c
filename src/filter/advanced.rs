use tracing::debug;

use crate::config::CONFIG;
use crate::database::collection::{Collection, FindQuery};
use crate::database::schema::Populate;
use crate::error::ApiError;

use super::filter::Filter;
use super::params::QueryParams;
use super::types::ListEnvelope;

/// Per-endpoint knobs of the listing pipeline
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub default_limit: i64,
    pub max_limit: Option<i64>,
    pub debug_logging: bool,
}

impl ListOptions {
    pub fn from_config() -> Self {
        Self {
            default_limit: CONFIG.listing.default_limit,
            max_limit: CONFIG.listing.max_limit,
            debug_logging: CONFIG.listing.debug_logging,
        }
    }

    pub fn with_default_limit(mut self, default_limit: i64) -> Self {
        self.default_limit = default_limit;
        self
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::from_config()
    }
}

/// Run a list request against a collection: parse the query string, count
/// the matches, fetch one page and wrap it with pagination links.
///
/// The count and the fetch are separate reads; a write landing between
/// them can make `pagination` disagree with `data` by a document.
pub async fn advanced_results<C>(
    collection: &C,
    params: &QueryParams,
    populate: Option<&'static Populate>,
    options: &ListOptions,
) -> Result<ListEnvelope, ApiError>
where
    C: Collection + ?Sized,
{
    let schema = collection.schema();
    let filter = Filter::from_params(schema, params, options.default_limit, options.max_limit)?;

    if options.debug_logging {
        debug!(
            "Listing {}: {} condition(s), page {} limit {}",
            schema.table,
            filter.predicate.conditions.len(),
            filter.window.page,
            filter.window.limit
        );
    }

    let total = collection.count(&filter.predicate).await?;

    let query = FindQuery {
        filter: filter.predicate,
        projection: filter.projection,
        sort: filter.sort,
        skip: filter.window.skip(),
        limit: Some(filter.window.limit),
        populate,
    };
    let data = collection.find(&query).await?;

    Ok(ListEnvelope {
        success: true,
        pagination: filter.window.pagination(total, data.len()),
        count: data.len(),
        data,
    })
}
