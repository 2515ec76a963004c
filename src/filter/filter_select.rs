use crate::database::schema::CollectionSchema;

use super::error::FilterError;
use super::types::Projection;

pub struct FilterSelect;

impl FilterSelect {
    /// Parse `select=name,description`. Every `-` and `$` is stripped from a
    /// token, so exclusion and operator syntax cannot reach the store.
    pub fn parse(schema: &'static CollectionSchema, select: Option<&str>) -> Result<Projection, FilterError> {
        let Some(select) = select else {
            return Ok(Projection::all());
        };

        let mut projection = Projection::default();
        for token in select.split(',') {
            let name: String = token.chars().filter(|c| *c != '-' && *c != '$').collect();
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let field = schema
                .field(name)
                .ok_or_else(|| FilterError::UnknownField(name.to_string()))?;
            if !field.selectable {
                return Err(FilterError::NotSelectable(name.to_string()));
            }
            if !projection.fields.iter().any(|f| f.name == field.name) {
                projection.fields.push(field);
            }
        }

        let id = schema.id_field();
        if !projection.is_all() && !projection.fields.iter().any(|f| f.name == id.name) {
            projection.fields.insert(0, id);
        }
        Ok(projection)
    }
}
