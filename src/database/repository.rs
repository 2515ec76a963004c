use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use crate::database::collection::{Collection, FindQuery};
use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::database::schema::CollectionSchema;
use crate::filter::FilterExpr;

/// SQL-backed collection: one table described by a static schema
#[derive(Clone)]
pub struct Repository {
    schema: &'static CollectionSchema,
    pool: PgPool,
}

impl Repository {
    pub fn new(schema: &'static CollectionSchema, pool: PgPool) -> Self {
        Self { schema, pool }
    }
}

#[async_trait]
impl Collection for Repository {
    fn schema(&self) -> &'static CollectionSchema {
        self.schema
    }

    async fn count(&self, filter: &FilterExpr) -> Result<i64, DatabaseError> {
        let sql = QueryBuilder::count_sql(self.schema, filter);
        debug!("{} {:?}", sql.query, sql.params);
        let count = sql
            .bind_scalar(sqlx::query_scalar::<_, i64>(&sql.query))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find(&self, query: &FindQuery) -> Result<Vec<Value>, DatabaseError> {
        let sql = QueryBuilder::find_sql(self.schema, query);
        debug!("{} {:?}", sql.query, sql.params);
        let docs = sql
            .bind_scalar(sqlx::query_scalar::<_, Value>(&sql.query))
            .fetch_all(&self.pool)
            .await?;
        Ok(docs)
    }
}
