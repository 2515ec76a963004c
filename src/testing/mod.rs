//! Test doubles for the listing pipeline.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::database::collection::{Collection, FindQuery};
use crate::database::manager::DatabaseError;
use crate::database::query_builder::EARTH_RADIUS_MILES;
use crate::database::schema::{CollectionSchema, FieldKind};
use crate::filter::{Condition, FilterExpr, FilterOp, GeoWithin, SortDirection};

/// A collection held in memory as JSON documents keyed by public field names
pub struct MemoryCollection {
    schema: &'static CollectionSchema,
    documents: Vec<Value>,
}

impl MemoryCollection {
    pub fn new(schema: &'static CollectionSchema, documents: Vec<Value>) -> Self {
        Self { schema, documents }
    }

    fn matches(&self, doc: &Value, filter: &FilterExpr) -> bool {
        filter.conditions.iter().all(|c| condition_holds(doc, c))
            && filter.within.map_or(true, |w| within(doc, &w))
    }
}

/// `location.city` style lookups
fn lookup<'a>(doc: &'a Value, name: &str) -> &'a Value {
    name.split('.').fold(doc, |value, key| value.get(key).unwrap_or(&Value::Null))
}

fn compare(value: &Value, literal: &str, kind: FieldKind) -> Option<Ordering> {
    match kind {
        FieldKind::Integer | FieldKind::Float => value.as_f64()?.partial_cmp(&literal.parse::<f64>().ok()?),
        FieldKind::Boolean => Some(value.as_bool()?.cmp(&(literal == "true"))),
        FieldKind::Uuid => Some(value.as_str()?.to_lowercase().cmp(&literal.to_lowercase())),
        _ => Some(value.as_str()?.cmp(literal)),
    }
}

fn condition_holds(doc: &Value, condition: &Condition) -> bool {
    let value = lookup(doc, condition.field.name);
    let literals = condition.value.values();

    if condition.field.kind == FieldKind::TextArray {
        let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
        return literals
            .iter()
            .any(|literal| items.iter().any(|item| item.as_str() == Some(*literal)));
    }

    let ord = |literal: &str| compare(value, literal, condition.field.kind);
    match condition.op {
        FilterOp::Eq | FilterOp::In => literals.iter().any(|l| ord(l) == Some(Ordering::Equal)),
        FilterOp::Lt => ord(literals[0]) == Some(Ordering::Less),
        FilterOp::Lte => matches!(ord(literals[0]), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Gt => ord(literals[0]) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(ord(literals[0]), Some(Ordering::Greater | Ordering::Equal)),
    }
}

fn within(doc: &Value, area: &GeoWithin) -> bool {
    let coordinates = lookup(doc, "location.coordinates");
    let (Some(lng), Some(lat)) = (coordinates[0].as_f64(), coordinates[1].as_f64()) else {
        return false;
    };
    let (lat1, lat2) = (area.latitude.to_radians(), lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (lng - area.longitude).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().min(1.0).asin() <= area.radius_miles
}

/// Nulls sort lowest, like the SQL store
fn order_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => x.as_str().cmp(&y.as_str()),
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn schema(&self) -> &'static CollectionSchema {
        self.schema
    }

    async fn count(&self, filter: &FilterExpr) -> Result<i64, DatabaseError> {
        Ok(self.documents.iter().filter(|d| self.matches(d, filter)).count() as i64)
    }

    async fn find(&self, query: &FindQuery) -> Result<Vec<Value>, DatabaseError> {
        if query.populate.is_some() {
            return Err(DatabaseError::QueryError("populate needs the SQL store".to_string()));
        }

        let mut found: Vec<&Value> = self.documents.iter().filter(|d| self.matches(d, &query.filter)).collect();
        found.sort_by(|a, b| {
            query
                .sort
                .iter()
                .map(|key| {
                    let ord = order_values(lookup(a, key.field.name), lookup(b, key.field.name));
                    match key.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or_else(|| order_values(&a["id"], &b["id"]))
        });

        let skip = usize::try_from(query.skip).unwrap_or(0);
        let take = query.limit.and_then(|l| usize::try_from(l).ok()).unwrap_or(usize::MAX);

        Ok(found
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|doc| {
                let projected: Map<String, Value> = self
                    .schema
                    .selectable_fields()
                    .filter(|f| query.projection.includes(f.name))
                    .filter_map(|f| doc.get(f.name).map(|v| (f.name.to_string(), v.clone())))
                    .collect();
                Value::Object(projected)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::{BOOTCAMPS, BOOTCAMP_COURSES};
    use crate::filter::{advanced_results, ListOptions, PageRef, QueryParams};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Counting fails with a pool timeout; finds are only tallied
    #[derive(Default)]
    struct UnreachableStore {
        finds: AtomicUsize,
    }

    #[async_trait]
    impl Collection for UnreachableStore {
        fn schema(&self) -> &'static CollectionSchema {
            &BOOTCAMPS
        }

        async fn count(&self, _filter: &FilterExpr) -> Result<i64, DatabaseError> {
            Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
        }

        async fn find(&self, _query: &FindQuery) -> Result<Vec<Value>, DatabaseError> {
            self.finds.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(vec![])
        }
    }

    fn options() -> ListOptions {
        ListOptions {
            default_limit: 25,
            max_limit: Some(100),
            debug_logging: false,
        }
    }

    fn bootcamp(n: u32, name: &str, careers: &[&str], average_cost: Option<f64>) -> Value {
        json!({
            "id": format!("00000000-0000-4000-8000-{:012}", n),
            "name": name,
            "description": format!("{} description", name),
            "careers": careers,
            "averageCost": average_cost,
            "housing": n % 2 == 0,
            "location": {
                "type": "Point",
                "coordinates": [-71.104081 + f64::from(n) * 0.01, 42.350431],
                "city": if n % 2 == 0 { "Boston" } else { "Kingston" },
            },
            "createdAt": format!("2024-01-0{}T00:00:00Z", n),
        })
    }

    /// Five Web Development bootcamps created on days 1..=5 plus one Business bootcamp
    fn collection() -> MemoryCollection {
        let mut docs: Vec<Value> = (1..=5)
            .map(|n| bootcamp(n, &format!("Camp {}", n), &["Web Development"], Some(f64::from(n) * 1000.0)))
            .collect();
        docs.push(bootcamp(6, "gte", &["Business"], None));
        MemoryCollection::new(&BOOTCAMPS, docs)
    }

    fn names(data: &[Value]) -> Vec<&str> {
        data.iter().filter_map(|d| d["name"].as_str()).collect()
    }

    async fn list(query: &str, options: &ListOptions) -> crate::filter::ListEnvelope {
        advanced_results(&collection(), &QueryParams::parse(query), None, options)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn second_page_of_five_matches() {
        let result = list("careers=Web+Development&page=2&limit=2", &options()).await;

        assert_eq!(result.count, 2);
        assert_eq!(names(&result.data), vec!["Camp 3", "Camp 2"]);
        assert_eq!(result.pagination.next, Some(PageRef { page: 3, limit: 2 }));
        assert_eq!(result.pagination.prev, Some(PageRef { page: 1, limit: 2 }));
    }

    #[tokio::test]
    async fn no_matches_means_empty_pagination() {
        let result = list("careers=UI%2FUX", &options()).await;
        assert_eq!(result.count, 0);
        assert!(result.data.is_empty());

        let body = serde_json::to_value(&result).unwrap();
        assert_eq!(body["pagination"], json!({}));
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn page_past_the_end_drops_prev() {
        let result = list("page=10&limit=2", &options()).await;
        assert!(result.data.is_empty());
        assert_eq!(result.pagination.prev, None);
        assert_eq!(result.pagination.next, None);
    }

    #[tokio::test]
    async fn default_order_is_newest_first() {
        let result = list("", &options()).await;
        assert_eq!(
            names(&result.data),
            vec!["gte", "Camp 5", "Camp 4", "Camp 3", "Camp 2", "Camp 1"]
        );
        assert_eq!(result.pagination.next, None);
        assert_eq!(result.pagination.prev, None);
    }

    #[tokio::test]
    async fn explicit_sort_with_nulls_lowest() {
        let result = list("sort=averageCost", &options()).await;
        assert_eq!(names(&result.data)[0], "gte");
        assert_eq!(names(&result.data)[5], "Camp 5");

        let result = list("sort=-averageCost", &options()).await;
        assert_eq!(names(&result.data)[0], "Camp 5");
    }

    #[tokio::test]
    async fn select_markers_are_stripped() {
        for query in ["select=name,-averageCost", "select=name,$averageCost", "select=name,averageCost"] {
            let result = list(query, &options()).await;
            let mut keys: Vec<&String> = result.data[0].as_object().unwrap().keys().collect();
            keys.sort();
            assert_eq!(keys, vec!["averageCost", "id", "name"], "{}", query);
        }
    }

    #[tokio::test]
    async fn operator_words_in_values_stay_literal() {
        let result = list("name=gte", &options()).await;
        assert_eq!(names(&result.data), vec!["gte"]);
    }

    #[tokio::test]
    async fn range_and_in_operators() {
        let result = list("averageCost[gte]=2000&averageCost[lt]=4000&sort=name", &options()).await;
        assert_eq!(names(&result.data), vec!["Camp 2", "Camp 3"]);

        let result = list("careers[in]=Business,UI%2FUX", &options()).await;
        assert_eq!(names(&result.data), vec!["gte"]);

        let result = list("location.city=Boston&housing=true&sort=name", &options()).await;
        assert_eq!(names(&result.data), vec!["Camp 2", "Camp 4", "gte"]);
    }

    #[tokio::test]
    async fn bootcamp_default_limit_of_four() {
        let options = options().with_default_limit(4);
        let result = list("", &options).await;
        assert_eq!(result.count, 4);
        assert_eq!(result.pagination.next, Some(PageRef { page: 2, limit: 4 }));
        assert_eq!(result.pagination.prev, None);
    }

    #[tokio::test]
    async fn malformed_page_and_limit_fall_back() {
        let result = list("page=abc&limit=-3", &options()).await;
        assert_eq!(result.count, 6);
    }

    #[tokio::test]
    async fn limit_is_capped() {
        let capped = ListOptions { max_limit: Some(2), ..options() };
        let result = list("limit=50", &capped).await;
        assert_eq!(result.count, 2);
        assert_eq!(result.pagination.next, Some(PageRef { page: 2, limit: 2 }));
    }

    #[tokio::test]
    async fn unknown_fields_are_rejected() {
        let err = advanced_results(&collection(), &QueryParams::parse("price[gte]=10"), None, &options())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = advanced_results(&collection(), &QueryParams::parse("averageCost[ne]=10"), None, &options())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn failed_fetch_is_returned_as_server_error() {
        let params = QueryParams::parse("page=2");
        let err = advanced_results(&collection(), &params, Some(&BOOTCAMP_COURSES), &options())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn failed_count_stops_the_listing() {
        let store = UnreachableStore::default();
        let err = advanced_results(&store, &QueryParams::parse(""), None, &options())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert_eq!(store.finds.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn radius_search_uses_great_circle_distance() {
        let near = FilterExpr::new().within(GeoWithin {
            longitude: -71.104081,
            latitude: 42.350431,
            radius_miles: 2.0,
        });
        let found = collection().find_all(near, None).await.unwrap();
        // 0.01 degrees of longitude at this latitude is about 0.51 miles
        assert_eq!(found.len(), 3);
    }
}
