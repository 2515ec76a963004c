use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::filter::{Condition, FilterExpr, FilterOrder, Projection, SortKey};

use super::manager::DatabaseError;
use super::schema::{CollectionSchema, Populate};

/// A single read against a collection
#[derive(Debug, Clone)]
pub struct FindQuery {
    pub filter: FilterExpr,
    pub projection: Projection,
    pub sort: Vec<SortKey>,
    pub skip: i64,
    /// `None` returns every match
    pub limit: Option<i64>,
    pub populate: Option<&'static Populate>,
}

impl FindQuery {
    pub fn new(schema: &'static CollectionSchema, filter: FilterExpr) -> Self {
        Self {
            filter,
            projection: Projection::all(),
            sort: vec![FilterOrder::default_order(schema)],
            skip: 0,
            limit: None,
            populate: None,
        }
    }

    pub fn populate(mut self, populate: Option<&'static Populate>) -> Self {
        self.populate = populate;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Anything that can filter, project, sort, page and populate documents
#[async_trait]
pub trait Collection: Send + Sync {
    fn schema(&self) -> &'static CollectionSchema;

    async fn count(&self, filter: &FilterExpr) -> Result<i64, DatabaseError>;

    async fn find(&self, query: &FindQuery) -> Result<Vec<Value>, DatabaseError>;

    async fn find_by_id(&self, id: Uuid, populate: Option<&'static Populate>) -> Result<Option<Value>, DatabaseError> {
        let schema = self.schema();
        let filter = FilterExpr::new().and(Condition::eq(schema.id_field(), id.to_string()));
        let query = FindQuery::new(schema, filter).populate(populate).limit(1);
        Ok(self.find(&query).await?.into_iter().next())
    }

    /// Every match, newest first
    async fn find_all(&self, filter: FilterExpr, populate: Option<&'static Populate>) -> Result<Vec<Value>, DatabaseError> {
        let query = FindQuery::new(self.schema(), filter).populate(populate);
        self.find(&query).await
    }
}
