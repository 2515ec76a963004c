use crate::database::schema::CollectionSchema;

use super::error::FilterError;
use super::types::{SortDirection, SortKey};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `sort=-averageCost,name`. Absent or blank means newest first.
    pub fn parse(schema: &'static CollectionSchema, sort: Option<&str>) -> Result<Vec<SortKey>, FilterError> {
        let mut out = Vec::new();
        for part in sort.unwrap_or_default().split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (name, direction) = match trimmed.strip_prefix('-') {
                Some(name) => (name.trim(), SortDirection::Desc),
                None => (trimmed.trim_start_matches('+').trim(), SortDirection::Asc),
            };
            if name.is_empty() {
                continue;
            }
            let field = schema
                .field(name)
                .ok_or_else(|| FilterError::UnknownField(name.to_string()))?;
            if !field.is_column() {
                return Err(FilterError::NotSortable(name.to_string()));
            }
            out.push(SortKey { field, direction });
        }

        if out.is_empty() {
            out.push(Self::default_order(schema));
        }
        Ok(out)
    }

    pub fn default_order(schema: &'static CollectionSchema) -> SortKey {
        SortKey {
            field: schema.field(schema.created_field).unwrap_or_else(|| schema.id_field()),
            direction: SortDirection::Desc,
        }
    }
}
