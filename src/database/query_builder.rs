//! Renders collection reads as parameterized PostgreSQL.
//!
//! Each document comes back as a single `json` column built with
//! `json_build_object`, so the repository never maps rows by hand. Literals
//! are always bound as parameters and cast to the field's type inside the
//! statement; identifiers only ever come from the static schemas.

use sqlx::postgres::PgArguments;
use sqlx::query::QueryScalar;
use sqlx::Postgres;

use crate::filter::{Condition, FilterExpr, FilterOp, FilterValue, GeoWithin, Projection, SortDirection, SortKey};

use super::collection::FindQuery;
use super::schema::{CollectionSchema, FieldKind, FieldSpec, Populate, Relation};

/// Mean earth radius used for radius searches
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

const ROOT: &str = "t";
const RELATED: &str = "p";

#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    TextArray(Vec<String>),
    Float(f64),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

impl SqlResult {
    pub fn bind_scalar<'q, O>(
        &self,
        mut q: QueryScalar<'q, Postgres, O, PgArguments>,
    ) -> QueryScalar<'q, Postgres, O, PgArguments> {
        for param in &self.params {
            q = match param {
                SqlParam::Text(v) => q.bind(v.clone()),
                SqlParam::TextArray(v) => q.bind(v.clone()),
                SqlParam::Float(v) => q.bind(*v),
            };
        }
        q
    }
}

pub struct QueryBuilder {
    schema: &'static CollectionSchema,
    params: Vec<SqlParam>,
}

impl QueryBuilder {
    pub fn new(schema: &'static CollectionSchema) -> Self {
        Self { schema, params: vec![] }
    }

    pub fn count_sql(schema: &'static CollectionSchema, filter: &FilterExpr) -> SqlResult {
        let mut builder = Self::new(schema);
        let where_clause = builder.where_clause(filter);
        SqlResult {
            query: format!(
                "SELECT COUNT(*) AS count FROM \"{}\" {} WHERE {}",
                schema.table, ROOT, where_clause
            ),
            params: builder.params,
        }
    }

    pub fn find_sql(schema: &'static CollectionSchema, query: &FindQuery) -> SqlResult {
        let mut builder = Self::new(schema);
        let document = builder.document(&query.projection, query.populate);
        let where_clause = builder.where_clause(&query.filter);
        let order_by = builder.order_by(&query.sort);

        let mut sql = format!(
            "SELECT {} AS doc FROM \"{}\" {} WHERE {} ORDER BY {}",
            document, schema.table, ROOT, where_clause, order_by
        );
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit.max(0)));
        }
        if query.skip > 0 {
            sql.push_str(&format!(" OFFSET {}", query.skip));
        }

        SqlResult { query: sql, params: builder.params }
    }

    fn push(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    fn document(&self, projection: &Projection, populate: Option<&'static Populate>) -> String {
        let fields: Vec<&'static FieldSpec> = if projection.is_all() {
            self.schema.selectable_fields().collect()
        } else {
            projection.fields.clone()
        };

        let mut pairs = Vec::with_capacity(fields.len() + 1);
        for field in fields {
            let value = match populate {
                Some(p) if matches!(p.relation, Relation::BelongsTo { local_field } if local_field == field.name) => {
                    Self::belongs_to(field, p)
                }
                _ => field.source.render(ROOT),
            };
            pairs.push(format!("'{}', {}", field.name, value));
        }

        if let Some(p) = populate {
            if let Relation::HasMany { foreign_field } = p.relation {
                pairs.push(format!("'{}', {}", p.path, self.has_many(p, foreign_field)));
            }
        }

        format!("json_build_object({})", pairs.join(", "))
    }

    fn related_object(populate: &Populate) -> String {
        let pairs: Vec<String> = populate
            .target_fields()
            .iter()
            .map(|f| format!("'{}', {}", f.name, f.source.render(RELATED)))
            .collect();
        format!("json_build_object({})", pairs.join(", "))
    }

    fn belongs_to(local: &FieldSpec, populate: &Populate) -> String {
        format!(
            "(SELECT {} FROM \"{}\" {} WHERE {} = {})",
            Self::related_object(populate),
            populate.target.table,
            RELATED,
            populate.target.id_field().source.render(RELATED),
            local.source.render(ROOT)
        )
    }

    fn has_many(&self, populate: &Populate, foreign_field: &str) -> String {
        let target = populate.target;
        let foreign = target
            .field(foreign_field)
            .map(|f| f.source.render(RELATED))
            .unwrap_or_else(|| format!("{}.\"{}\"", RELATED, foreign_field));
        let created = target
            .field(target.created_field)
            .unwrap_or_else(|| target.id_field())
            .source
            .render(RELATED);
        format!(
            "(SELECT COALESCE(json_agg({} ORDER BY {}), '[]'::json) FROM \"{}\" {} WHERE {} = {})",
            Self::related_object(populate),
            created,
            target.table,
            RELATED,
            foreign,
            self.schema.id_field().source.render(ROOT)
        )
    }

    fn where_clause(&mut self, filter: &FilterExpr) -> String {
        let mut parts: Vec<String> = filter
            .conditions
            .iter()
            .map(|c| self.condition(c))
            .collect();
        if let Some(within) = filter.within {
            if let Some(sql) = self.within(within) {
                parts.push(sql);
            }
        }
        if parts.is_empty() {
            "1=1".to_string()
        } else {
            parts.join(" AND ")
        }
    }

    fn condition(&mut self, condition: &Condition) -> String {
        let field = condition.field;
        let column = field.source.render(ROOT);
        let pg_type = field.kind.pg_type();

        match (&condition.op, &condition.value) {
            (FilterOp::In, value) => {
                let values = value.values().into_iter().map(str::to_string).collect();
                let param = self.push(SqlParam::TextArray(values));
                if field.kind == FieldKind::TextArray {
                    format!("{} && {}::text[]", column, param)
                } else {
                    format!("{} = ANY({}::{}[])", column, param, pg_type)
                }
            }
            (op, FilterValue::Single(value)) => {
                let param = self.push(SqlParam::Text(value.clone()));
                if field.kind == FieldKind::TextArray {
                    format!("{}::text = ANY({})", param, column)
                } else {
                    format!("{} {} {}::{}", column, op.to_sql(), param, pg_type)
                }
            }
            // A list only ever pairs with `in`; treat anything else as a match on any element
            (_, FilterValue::List(values)) => {
                let param = self.push(SqlParam::TextArray(values.clone()));
                format!("{} = ANY({}::{}[])", column, param, pg_type)
            }
        }
    }

    fn within(&mut self, within: GeoWithin) -> Option<String> {
        let geo = self.schema.geo?;
        let lng = self.push(SqlParam::Float(within.longitude));
        let lat = self.push(SqlParam::Float(within.latitude));
        let radius = self.push(SqlParam::Float(within.radius_miles));
        let t_lng = format!("{}.\"{}\"", ROOT, geo.longitude);
        let t_lat = format!("{}.\"{}\"", ROOT, geo.latitude);
        Some(format!(
            "({t_lat} IS NOT NULL AND 2 * {r} * asin(LEAST(1.0, sqrt(\
             power(sin(radians({t_lat} - {lat}::double precision) / 2), 2) + \
             cos(radians({lat}::double precision)) * cos(radians({t_lat})) * \
             power(sin(radians({t_lng} - {lng}::double precision) / 2), 2)))) <= {radius}::double precision)",
            r = EARTH_RADIUS_MILES,
        ))
    }

    /// Missing values sort lowest in both directions; `id` breaks ties
    fn order_by(&self, sort: &[SortKey]) -> String {
        let id = self.schema.id_field();
        let mut parts: Vec<String> = sort
            .iter()
            .map(|key| {
                let nulls = match key.direction {
                    SortDirection::Asc => "NULLS FIRST",
                    SortDirection::Desc => "NULLS LAST",
                };
                format!("{} {} {}", key.field.source.render(ROOT), key.direction.to_sql(), nulls)
            })
            .collect();
        if !sort.iter().any(|key| key.field.name == id.name) {
            parts.push(format!("{} ASC", id.source.render(ROOT)));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::{BOOTCAMPS, BOOTCAMP_COURSES, COURSES, COURSE_BOOTCAMP};
    use crate::filter::{FilterOrder, FilterSelect, FilterWhere};

    fn find(schema: &'static CollectionSchema, pairs: &[(&str, &str)]) -> FindQuery {
        let filter = FilterWhere::parse(schema, pairs.iter().copied()).unwrap();
        FindQuery::new(schema, filter)
    }

    #[test]
    fn count_without_filter_matches_everything() {
        let sql = QueryBuilder::count_sql(&BOOTCAMPS, &FilterExpr::new());
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM \"bootcamps\" t WHERE 1=1");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn comparisons_bind_literals_with_casts() {
        let query = find(&BOOTCAMPS, &[("averageCost[lte]", "10000"), ("housing", "true")]);
        let sql = QueryBuilder::find_sql(&BOOTCAMPS, &query);
        assert!(sql.query.contains("t.\"housing\" = $1::boolean"), "{}", sql.query);
        assert!(sql.query.contains("t.\"average_cost\" <= $2::double precision"), "{}", sql.query);
        assert_eq!(
            sql.params,
            vec![SqlParam::Text("true".into()), SqlParam::Text("10000".into())]
        );
        assert!(!sql.query.contains("10000"));
    }

    #[test]
    fn array_fields_use_containment() {
        let query = find(&BOOTCAMPS, &[("careers", "Business")]);
        let sql = QueryBuilder::find_sql(&BOOTCAMPS, &query);
        assert!(sql.query.contains("$1::text = ANY(t.\"careers\")"), "{}", sql.query);

        let query = find(&BOOTCAMPS, &[("careers[in]", "Business,Other")]);
        let sql = QueryBuilder::find_sql(&BOOTCAMPS, &query);
        assert!(sql.query.contains("t.\"careers\" && $1::text[]"), "{}", sql.query);
        assert_eq!(sql.params, vec![SqlParam::TextArray(vec!["Business".into(), "Other".into()])]);
    }

    #[test]
    fn scalar_in_uses_any() {
        let query = find(&COURSES, &[("minimumSkill[in]", "beginner,advanced")]);
        let sql = QueryBuilder::find_sql(&COURSES, &query);
        assert!(sql.query.contains("t.\"minimum_skill\" = ANY($1::text[])"), "{}", sql.query);
    }

    #[test]
    fn projection_sort_and_window() {
        let mut query = find(&BOOTCAMPS, &[]);
        query.projection = FilterSelect::parse(&BOOTCAMPS, Some("name")).unwrap();
        query.sort = FilterOrder::parse(&BOOTCAMPS, Some("-averageCost")).unwrap();
        query.skip = 50;
        query.limit = Some(25);
        let sql = QueryBuilder::find_sql(&BOOTCAMPS, &query);
        assert!(sql.query.starts_with(
            "SELECT json_build_object('id', t.\"id\", 'name', t.\"name\") AS doc FROM \"bootcamps\" t"
        ));
        assert!(sql
            .query
            .ends_with("ORDER BY t.\"average_cost\" DESC NULLS LAST, t.\"id\" ASC LIMIT 25 OFFSET 50"));
    }

    #[test]
    fn has_many_populate_embeds_array() {
        let query = find(&BOOTCAMPS, &[]).populate(Some(&BOOTCAMP_COURSES));
        let sql = QueryBuilder::find_sql(&BOOTCAMPS, &query);
        assert!(sql.query.contains("'courses', (SELECT COALESCE(json_agg("), "{}", sql.query);
        assert!(sql.query.contains("FROM \"courses\" p WHERE p.\"bootcamp_id\" = t.\"id\""));
    }

    #[test]
    fn belongs_to_populate_replaces_reference() {
        let query = find(&COURSES, &[]).populate(Some(&COURSE_BOOTCAMP));
        let sql = QueryBuilder::find_sql(&COURSES, &query);
        assert!(sql.query.contains(
            "'bootcamp', (SELECT json_build_object('id', p.\"id\", 'name', p.\"name\", 'description', p.\"description\") \
             FROM \"bootcamps\" p WHERE p.\"id\" = t.\"bootcamp_id\")"
        ), "{}", sql.query);
    }

    #[test]
    fn belongs_to_populate_skipped_when_not_projected() {
        let mut query = find(&COURSES, &[]).populate(Some(&COURSE_BOOTCAMP));
        query.projection = FilterSelect::parse(&COURSES, Some("title")).unwrap();
        let sql = QueryBuilder::find_sql(&COURSES, &query);
        assert!(!sql.query.contains("FROM \"bootcamps\""));
    }

    #[test]
    fn radius_search_binds_coordinates() {
        let filter = FilterExpr::new().within(GeoWithin { longitude: -71.1, latitude: 42.3, radius_miles: 10.0 });
        let sql = QueryBuilder::count_sql(&BOOTCAMPS, &filter);
        assert!(sql.query.contains("2 * 3959 * asin(LEAST(1.0, sqrt("), "{}", sql.query);
        assert_eq!(
            sql.params,
            vec![SqlParam::Float(-71.1), SqlParam::Float(42.3), SqlParam::Float(10.0)]
        );
    }
}
