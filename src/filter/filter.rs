use crate::database::schema::CollectionSchema;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_select::FilterSelect;
use super::filter_where::FilterWhere;
use super::page::PageWindow;
use super::params::QueryParams;
use super::types::{FilterExpr, Projection, SortKey};

/// Everything a list request asks of a collection, parsed and validated
#[derive(Debug, Clone)]
pub struct Filter {
    pub predicate: FilterExpr,
    pub projection: Projection,
    pub sort: Vec<SortKey>,
    pub window: PageWindow,
}

impl Filter {
    pub fn from_params(
        schema: &'static CollectionSchema,
        params: &QueryParams,
        default_limit: i64,
        max_limit: Option<i64>,
    ) -> Result<Self, FilterError> {
        Ok(Self {
            predicate: FilterWhere::parse(schema, params.filters())?,
            projection: FilterSelect::parse(schema, params.control("select"))?,
            sort: FilterOrder::parse(schema, params.control("sort"))?,
            window: PageWindow::from_params(
                params.control("page"),
                params.control("limit"),
                default_limit,
                max_limit,
            ),
        })
    }
}
