use serde::Deserialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::error::ApiError;

use super::validate::{trimmed, Validator};

pub const SKILLS: [&str; 3] = ["beginner", "intermediate", "advanced"];

#[derive(Debug, Clone, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub bootcamp_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<f64>,
    pub tuition: Option<f64>,
    pub minimum_skill: Option<String>,
    pub scholarship_available: Option<bool>,
}

/// Course with numeric fields rounded to whole units
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<i32>,
    pub tuition: Option<i32>,
    pub minimum_skill: Option<String>,
    pub scholarship_available: Option<bool>,
}

fn whole(value: Option<f64>) -> Option<i32> {
    value
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

impl CourseInput {
    fn rules(&self, v: &mut Validator) -> ValidCourse {
        let course = ValidCourse {
            title: trimmed(&self.title),
            description: self.description.clone(),
            weeks: whole(self.weeks),
            tuition: whole(self.tuition),
            minimum_skill: trimmed(&self.minimum_skill),
            scholarship_available: self.scholarship_available,
        };
        v.check(course.weeks.map_or(true, |w| w > 0), "Number of weeks must be positive")
            .check(course.tuition.map_or(true, |t| t >= 0), "Tuition cost can not be negative")
            .one_of(course.minimum_skill.as_deref(), &SKILLS, "Minimum skill must be beginner, intermediate or advanced");
        course
    }

    pub fn validate_create(&self) -> Result<ValidCourse, ApiError> {
        let mut v = Validator::new();
        v.required(self.title.as_deref(), "title is required")
            .required(self.description.as_deref(), "Description is required")
            .check(self.weeks.is_some(), "Number of weeks is required")
            .check(self.tuition.is_some(), "Tuition cost is required")
            .required(self.minimum_skill.as_deref(), "Minimum skill is required");
        let course = self.rules(&mut v);
        v.finish()?;
        Ok(course)
    }

    pub fn validate_update(&self) -> Result<ValidCourse, ApiError> {
        let mut v = Validator::new();
        v.check(self.title.as_deref().map_or(true, |t| !t.trim().is_empty()), "title is required")
            .check(
                self.description.as_deref().map_or(true, |d| !d.trim().is_empty()),
                "Description is required",
            );
        let course = self.rules(&mut v);
        v.finish()?;
        Ok(course)
    }
}

impl Course {
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(ex: E, id: Uuid) -> Result<Option<Course>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, Course>("SELECT id, bootcamp_id, user_id FROM courses WHERE id = $1")
                .bind(id)
                .fetch_optional(ex)
                .await?,
        )
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(
        ex: E,
        bootcamp_id: Uuid,
        user_id: Uuid,
        course: &ValidCourse,
    ) -> Result<Uuid, DatabaseError> {
        let id = sqlx::query_scalar(
            "INSERT INTO courses (title, description, weeks, tuition, minimum_skill, scholarship_available, \
             bootcamp_id, user_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(course.title.as_deref())
        .bind(course.description.as_deref())
        .bind(course.weeks)
        .bind(course.tuition)
        .bind(course.minimum_skill.as_deref())
        .bind(course.scholarship_available.unwrap_or(false))
        .bind(bootcamp_id)
        .bind(user_id)
        .fetch_one(ex)
        .await?;
        Ok(id)
    }

    pub async fn update<'e, E: PgExecutor<'e>>(ex: E, id: Uuid, course: &ValidCourse) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE courses SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             weeks = COALESCE($4, weeks), \
             tuition = COALESCE($5, tuition), \
             minimum_skill = COALESCE($6, minimum_skill), \
             scholarship_available = COALESCE($7, scholarship_available) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(course.title.as_deref())
        .bind(course.description.as_deref())
        .bind(course.weeks)
        .bind(course.tuition)
        .bind(course.minimum_skill.as_deref())
        .bind(course.scholarship_available)
        .execute(ex)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(ex: E, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM courses WHERE id = $1").bind(id).execute(ex).await?;
        Ok(())
    }
}
