//! Static descriptions of the collections exposed through list endpoints.
//!
//! A schema maps the public (camelCase) field names used in query strings and
//! JSON documents onto SQL sources. Every identifier that ends up in generated
//! SQL comes from here, never from request input.

use chrono::{DateTime, NaiveDate};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uuid,
    Text,
    TextArray,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Json,
}

impl FieldKind {
    /// Whether a query-string literal can be interpreted as a value of this kind
    pub fn accepts(&self, literal: &str) -> bool {
        let literal = literal.trim();
        match self {
            FieldKind::Uuid => Uuid::parse_str(literal).is_ok(),
            FieldKind::Text | FieldKind::TextArray => true,
            FieldKind::Integer => literal.parse::<i64>().is_ok(),
            FieldKind::Float => literal.parse::<f64>().map(f64::is_finite).unwrap_or(false),
            FieldKind::Boolean => literal == "true" || literal == "false",
            FieldKind::Timestamp => {
                DateTime::parse_from_rfc3339(literal).is_ok()
                    || NaiveDate::parse_from_str(literal, "%Y-%m-%d").is_ok()
            }
            FieldKind::Json => false,
        }
    }

    /// Postgres type a bound text literal is cast to (element type for arrays)
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldKind::Uuid => "uuid",
            FieldKind::Text | FieldKind::TextArray => "text",
            FieldKind::Integer => "bigint",
            FieldKind::Float => "double precision",
            FieldKind::Boolean => "boolean",
            FieldKind::Timestamp => "timestamptz",
            FieldKind::Json => "json",
        }
    }

    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            FieldKind::Text | FieldKind::Integer | FieldKind::Float | FieldKind::Timestamp
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Source {
    Column(&'static str),
    /// SQL expression built around a table alias
    Computed(fn(&str) -> String),
}

impl Source {
    pub fn render(&self, alias: &str) -> String {
        match self {
            Source::Column(column) => format!("{}.\"{}\"", alias, column),
            Source::Computed(build) => build(alias),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub source: Source,
    pub kind: FieldKind,
    pub selectable: bool,
    pub filterable: bool,
}

impl FieldSpec {
    const fn column(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, source: Source::Column(column), kind, selectable: true, filterable: true }
    }

    const fn filter_only(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, source: Source::Column(column), kind, selectable: false, filterable: true }
    }

    const fn computed(name: &'static str, build: fn(&str) -> String) -> Self {
        Self { name, source: Source::Computed(build), kind: FieldKind::Json, selectable: true, filterable: false }
    }

    pub fn is_column(&self) -> bool {
        matches!(self.source, Source::Column(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GeoColumns {
    pub longitude: &'static str,
    pub latitude: &'static str,
}

#[derive(Debug)]
pub struct CollectionSchema {
    /// Singular resource label used in messages ("Bootcamp not found ...")
    pub resource: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
    pub created_field: &'static str,
    pub geo: Option<GeoColumns>,
}

impl CollectionSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn id_field(&self) -> &'static FieldSpec {
        // Every schema below declares "id" first
        &self.fields[0]
    }

    pub fn selectable_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| f.selectable)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Relation {
    /// `local_field` of this collection holds the target's id
    BelongsTo { local_field: &'static str },
    /// `foreign_field` of the target holds this collection's id
    HasMany { foreign_field: &'static str },
}

/// Eager relation resolved inline into each returned document
#[derive(Debug, Clone, Copy)]
pub struct Populate {
    pub path: &'static str,
    pub target: &'static CollectionSchema,
    pub relation: Relation,
    /// Target fields to embed; `None` embeds every selectable field
    pub select: Option<&'static [&'static str]>,
}

impl Populate {
    pub fn target_fields(&self) -> Vec<&'static FieldSpec> {
        match self.select {
            None => self.target.selectable_fields().collect(),
            Some(names) => {
                let mut fields = vec![self.target.id_field()];
                fields.extend(names.iter().filter_map(|name| self.target.field(name)));
                fields
            }
        }
    }
}

fn location_sql(alias: &str) -> String {
    format!(
        "CASE WHEN {a}.\"longitude\" IS NULL THEN NULL ELSE json_build_object(\
         'type', 'Point', \
         'coordinates', json_build_array({a}.\"longitude\", {a}.\"latitude\"), \
         'formattedAddress', {a}.\"formatted_address\", \
         'street', {a}.\"street\", \
         'city', {a}.\"city\", \
         'state', {a}.\"state\", \
         'zipcode', {a}.\"zipcode\", \
         'country', {a}.\"country\") END",
        a = alias
    )
}

pub static BOOTCAMPS: CollectionSchema = CollectionSchema {
    resource: "Bootcamp",
    table: "bootcamps",
    fields: &[
        FieldSpec::column("id", "id", FieldKind::Uuid),
        FieldSpec::column("name", "name", FieldKind::Text),
        FieldSpec::column("slug", "slug", FieldKind::Text),
        FieldSpec::column("description", "description", FieldKind::Text),
        FieldSpec::column("website", "website", FieldKind::Text),
        FieldSpec::column("phone", "phone", FieldKind::Text),
        FieldSpec::column("email", "email", FieldKind::Text),
        FieldSpec::column("address", "address", FieldKind::Text),
        FieldSpec::computed("location", location_sql),
        FieldSpec::filter_only("location.city", "city", FieldKind::Text),
        FieldSpec::filter_only("location.state", "state", FieldKind::Text),
        FieldSpec::filter_only("location.zipcode", "zipcode", FieldKind::Text),
        FieldSpec::filter_only("location.country", "country", FieldKind::Text),
        FieldSpec::column("careers", "careers", FieldKind::TextArray),
        FieldSpec::column("averageRating", "average_rating", FieldKind::Float),
        FieldSpec::column("averageCost", "average_cost", FieldKind::Float),
        FieldSpec::column("photo", "photo", FieldKind::Text),
        FieldSpec::column("housing", "housing", FieldKind::Boolean),
        FieldSpec::column("jobAssistance", "job_assistance", FieldKind::Boolean),
        FieldSpec::column("jobGuarantee", "job_guarantee", FieldKind::Boolean),
        FieldSpec::column("acceptGi", "accept_gi", FieldKind::Boolean),
        FieldSpec::column("user", "user_id", FieldKind::Uuid),
        FieldSpec::column("createdAt", "created_at", FieldKind::Timestamp),
    ],
    created_field: "createdAt",
    geo: Some(GeoColumns { longitude: "longitude", latitude: "latitude" }),
};

pub static COURSES: CollectionSchema = CollectionSchema {
    resource: "Course",
    table: "courses",
    fields: &[
        FieldSpec::column("id", "id", FieldKind::Uuid),
        FieldSpec::column("title", "title", FieldKind::Text),
        FieldSpec::column("description", "description", FieldKind::Text),
        FieldSpec::column("weeks", "weeks", FieldKind::Integer),
        FieldSpec::column("tuition", "tuition", FieldKind::Integer),
        FieldSpec::column("minimumSkill", "minimum_skill", FieldKind::Text),
        FieldSpec::column("scholarshipAvailable", "scholarship_available", FieldKind::Boolean),
        FieldSpec::column("bootcamp", "bootcamp_id", FieldKind::Uuid),
        FieldSpec::column("user", "user_id", FieldKind::Uuid),
        FieldSpec::column("createdAt", "created_at", FieldKind::Timestamp),
    ],
    created_field: "createdAt",
    geo: None,
};

pub static REVIEWS: CollectionSchema = CollectionSchema {
    resource: "Review",
    table: "reviews",
    fields: &[
        FieldSpec::column("id", "id", FieldKind::Uuid),
        FieldSpec::column("title", "title", FieldKind::Text),
        FieldSpec::column("text", "text", FieldKind::Text),
        FieldSpec::column("rating", "rating", FieldKind::Integer),
        FieldSpec::column("bootcamp", "bootcamp_id", FieldKind::Uuid),
        FieldSpec::column("user", "user_id", FieldKind::Uuid),
        FieldSpec::column("createdAt", "created_at", FieldKind::Timestamp),
    ],
    created_field: "createdAt",
    geo: None,
};

// Password and reset-token columns are deliberately absent
pub static USERS: CollectionSchema = CollectionSchema {
    resource: "User",
    table: "users",
    fields: &[
        FieldSpec::column("id", "id", FieldKind::Uuid),
        FieldSpec::column("name", "name", FieldKind::Text),
        FieldSpec::column("email", "email", FieldKind::Text),
        FieldSpec::column("role", "role", FieldKind::Text),
        FieldSpec::column("createdAt", "created_at", FieldKind::Timestamp),
    ],
    created_field: "createdAt",
    geo: None,
};

/// Bootcamp listing: every course of each bootcamp
pub static BOOTCAMP_COURSES: Populate = Populate {
    path: "courses",
    target: &COURSES,
    relation: Relation::HasMany { foreign_field: "bootcamp" },
    select: None,
};

/// Single bootcamp: course summaries only
pub static BOOTCAMP_COURSE_SUMMARIES: Populate = Populate {
    path: "courses",
    target: &COURSES,
    relation: Relation::HasMany { foreign_field: "bootcamp" },
    select: Some(&["title", "description"]),
};

pub static COURSE_BOOTCAMP: Populate = Populate {
    path: "bootcamp",
    target: &BOOTCAMPS,
    relation: Relation::BelongsTo { local_field: "bootcamp" },
    select: Some(&["name", "description"]),
};

pub static REVIEW_BOOTCAMP: Populate = Populate {
    path: "bootcamp",
    target: &BOOTCAMPS,
    relation: Relation::BelongsTo { local_field: "bootcamp" },
    select: Some(&["name", "description"]),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_schema_starts_with_id() {
        for schema in [&BOOTCAMPS, &COURSES, &REVIEWS, &USERS] {
            assert_eq!(schema.id_field().name, "id", "{}", schema.table);
            assert!(schema.field(schema.created_field).is_some(), "{}", schema.table);
        }
    }

    #[test]
    fn users_never_expose_password_fields() {
        assert!(USERS.field("password").is_none());
        assert!(USERS.field("resetPasswordToken").is_none());
    }

    #[test]
    fn field_kinds_accept_matching_literals() {
        assert!(FieldKind::Float.accepts("10000.5"));
        assert!(!FieldKind::Float.accepts("cheap"));
        assert!(!FieldKind::Float.accepts("NaN"));
        assert!(FieldKind::Integer.accepts(" 12 "));
        assert!(!FieldKind::Integer.accepts("1.5"));
        assert!(FieldKind::Boolean.accepts("true"));
        assert!(!FieldKind::Boolean.accepts("yes"));
        assert!(FieldKind::Timestamp.accepts("2024-05-01"));
        assert!(FieldKind::Timestamp.accepts("2024-05-01T10:00:00Z"));
        assert!(!FieldKind::Uuid.accepts("5d713995b721c3bb38c1f5d0"));
    }

    #[test]
    fn summary_populate_always_embeds_id() {
        let names: Vec<_> = BOOTCAMP_COURSE_SUMMARIES.target_fields().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["id", "title", "description"]);
    }

    #[test]
    fn location_is_rendered_against_alias() {
        let sql = BOOTCAMPS.field("location").unwrap().source.render("p");
        assert!(sql.contains("p.\"longitude\""));
        assert!(!sql.contains("t.\""));
    }
}
