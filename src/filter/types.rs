use serde::Serialize;
use serde_json::Value;

use crate::database::schema::FieldSpec;

/// Comparison operators a query string may request via `field[op]=value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
}

impl FilterOp {
    /// Operator for a bracketed key suffix. Only these five tokens are honored.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::In => "IN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Single(String),
    List(Vec<String>),
}

impl FilterValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            FilterValue::Single(v) => vec![v.as_str()],
            FilterValue::List(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub field: &'static FieldSpec,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Condition {
    pub fn eq(field: &'static FieldSpec, value: impl Into<String>) -> Self {
        Self { field, op: FilterOp::Eq, value: FilterValue::Single(value.into()) }
    }
}

/// Great-circle radius around a point, in miles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoWithin {
    pub longitude: f64,
    pub latitude: f64,
    pub radius_miles: f64,
}

/// Conjunction of field conditions plus an optional radius constraint
#[derive(Debug, Clone, Default)]
pub struct FilterExpr {
    pub conditions: Vec<Condition>,
    pub within: Option<GeoWithin>,
}

impl FilterExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn within(mut self, within: GeoWithin) -> Self {
        self.within = Some(within);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.within.is_none()
    }
}

/// Fields to return; empty means every selectable field
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub fields: Vec<&'static FieldSpec>,
}

impl Projection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_all(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn includes(&self, name: &str) -> bool {
        self.is_all() || self.fields.iter().any(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: &'static FieldSpec,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// Response body of every paginated list endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ListEnvelope {
    pub success: bool,
    pub pagination: Pagination,
    pub count: usize,
    pub data: Vec<Value>,
}

/// Response body of unpaginated lists (nested resources, radius search)
#[derive(Debug, Clone, Serialize)]
pub struct CountedList {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Value>,
}

impl CountedList {
    pub fn new(data: Vec<Value>) -> Self {
        Self { success: true, count: data.len(), data }
    }
}
