use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::database::models::{Bootcamp, BootcampInput, Course, CourseInput, NewUser, Review, ReviewInput, User};
use crate::error::ApiError;
use crate::services::Geocoder;

/// One record of a seed file. `id` (or `_id`) is a file-local label that
/// other files use in their `user` / `bootcamp` references.
#[derive(Debug, Deserialize)]
pub struct SeedRecord<T> {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub user: Option<String>,
    pub bootcamp: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub bootcamps: usize,
    pub courses: usize,
    pub reviews: usize,
}

/// Labels from the seed files mapped to the ids the database assigned
#[derive(Debug, Default)]
pub struct Labels(HashMap<String, Uuid>);

impl Labels {
    fn remember(&mut self, label: Option<&str>, id: Uuid) {
        if let Some(label) = label {
            self.0.insert(label.to_string(), id);
        }
    }

    /// A label that was never imported may still be a literal id already in the database
    pub fn resolve(&self, kind: &str, label: Option<&str>) -> anyhow::Result<Uuid> {
        let label = label.ok_or_else(|| anyhow!("missing `{}` reference", kind))?;
        if let Some(id) = self.0.get(label) {
            return Ok(*id);
        }
        Uuid::parse_str(label).map_err(|_| anyhow!("unknown {} `{}`", kind, label))
    }
}

/// Read `<dir>/<file>`; a missing file is an empty list
pub fn load<T: DeserializeOwned>(dir: &Path, file: &str) -> anyhow::Result<Vec<SeedRecord<T>>> {
    let path = dir.join(file);
    if !path.exists() {
        info!("{} not found, skipping", path.display());
        return Ok(vec![]);
    }
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn rejected(what: &str, label: Option<&str>, err: ApiError) -> anyhow::Error {
    let label = label.unwrap_or("<unlabelled>");
    match err {
        ApiError::ValidationError { errors, .. } => anyhow!("{} {} rejected: {}", what, label, errors.join("; ")),
        other => anyhow!("{} {} rejected: {}", what, label, other),
    }
}

/// Import every seed file found in `dir` in a single transaction
pub async fn import(pool: &PgPool, geocoder: &dyn Geocoder, dir: &Path) -> anyhow::Result<SeedReport> {
    let users = load::<NewUser>(dir, "users.json")?;
    let bootcamps = load::<BootcampInput>(dir, "bootcamps.json")?;
    let courses = load::<CourseInput>(dir, "courses.json")?;
    let reviews = load::<ReviewInput>(dir, "reviews.json")?;

    let mut tx = pool.begin().await?;
    let mut labels = Labels::default();
    let mut report = SeedReport::default();

    for record in &users {
        let user = record
            .body
            .validate(true)
            .map_err(|e| rejected("user", record.id.as_deref(), e))?;
        let hash = hash_password(&user.password).await?;
        let inserted = User::insert(&mut *tx, &user, &hash).await?;
        labels.remember(record.id.as_deref(), inserted.id);
        report.users += 1;
    }

    let mut touched = Vec::new();
    for record in &bootcamps {
        let owner = labels.resolve("user", record.user.as_deref())?;
        let input = record
            .body
            .validate_create()
            .map_err(|e| rejected("bootcamp", record.id.as_deref(), e))?;
        let location = match input.address.as_deref() {
            Some(address) => geocoder.geocode(address).await?,
            None => None,
        };
        let id = Bootcamp::insert(&mut *tx, &input, owner, location.as_ref()).await?;
        labels.remember(record.id.as_deref(), id);
        touched.push(id);
        report.bootcamps += 1;
    }

    for record in &courses {
        let bootcamp = labels.resolve("bootcamp", record.bootcamp.as_deref())?;
        let owner = labels.resolve("user", record.user.as_deref())?;
        let course = record
            .body
            .validate_create()
            .map_err(|e| rejected("course", record.id.as_deref(), e))?;
        Course::insert(&mut *tx, bootcamp, owner, &course).await?;
        report.courses += 1;
    }

    for record in &reviews {
        let bootcamp = labels.resolve("bootcamp", record.bootcamp.as_deref())?;
        let author = labels.resolve("user", record.user.as_deref())?;
        let review = record
            .body
            .validate_create()
            .map_err(|e| rejected("review", record.id.as_deref(), e))?;
        Review::insert(&mut *tx, bootcamp, author, &review).await?;
        report.reviews += 1;
    }

    refresh_averages(&mut tx, &touched).await?;
    tx.commit().await?;
    Ok(report)
}

async fn refresh_averages(tx: &mut Transaction<'_, Postgres>, bootcamps: &[Uuid]) -> anyhow::Result<()> {
    for id in bootcamps {
        Bootcamp::refresh_average_cost(&mut **tx, *id).await?;
        Bootcamp::refresh_average_rating(&mut **tx, *id).await?;
    }
    Ok(())
}

/// Delete every row of every resource
pub async fn destroy(pool: &PgPool) -> anyhow::Result<SeedReport> {
    let mut tx = pool.begin().await?;
    let mut report = SeedReport::default();
    for (table, slot) in [
        ("reviews", &mut report.reviews),
        ("courses", &mut report.courses),
        ("bootcamps", &mut report.bootcamps),
        ("users", &mut report.users),
    ] {
        let result = sqlx::query(&format!("DELETE FROM {}", table)).execute(&mut *tx).await?;
        *slot = usize::try_from(result.rows_affected())?;
    }
    tx.commit().await?;
    Ok(report)
}

/// Refuse to import into a directory that holds none of the seed files
pub fn check_dir(dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let any = ["users.json", "bootcamps.json", "courses.json", "reviews.json"]
        .iter()
        .any(|file| dir.join(file).exists());
    if !any {
        bail!("{} holds no users/bootcamps/courses/reviews.json", dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn records_keep_labels_and_references() {
        let json = r#"[{
            "_id": "5d725a1b7b292f5f8ceff788",
            "user": "5c8a1d5b0190b214360dc031",
            "name": "Devcentral Bootcamp",
            "description": "Is coding your passion?",
            "address": "45 Upper College Rd Kingston RI 02881",
            "careers": ["Mobile Development", "Web Development"],
            "housing": false
        }]"#;
        let records: Vec<SeedRecord<BootcampInput>> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].id.as_deref(), Some("5d725a1b7b292f5f8ceff788"));
        assert_eq!(records[0].user.as_deref(), Some("5c8a1d5b0190b214360dc031"));
        assert_eq!(records[0].body.name.as_deref(), Some("Devcentral Bootcamp"));
        assert!(records[0].body.validate_create().is_ok());
    }

    #[test]
    fn labels_resolve_to_assigned_ids_or_literal_uuids() {
        let mut labels = Labels::default();
        let assigned = Uuid::new_v4();
        labels.remember(Some("alice"), assigned);

        assert_eq!(labels.resolve("user", Some("alice")).unwrap(), assigned);
        let literal = Uuid::new_v4();
        assert_eq!(labels.resolve("user", Some(&literal.to_string())).unwrap(), literal);
        assert!(labels.resolve("user", Some("bob")).is_err());
        assert!(labels.resolve("user", None).is_err());
    }

    #[test]
    fn missing_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load::<NewUser>(dir.path(), "users.json").unwrap().is_empty());
        assert!(check_dir(dir.path()).is_err());

        fs::write(dir.path().join("users.json"), "[]").unwrap();
        assert!(check_dir(dir.path()).is_ok());
    }
}
