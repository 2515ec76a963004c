use heck::ToKebabCase;
use serde::Deserialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::error::ApiError;
use crate::services::geocoder::GeoLocation;

use super::validate::{trimmed, Validator, EMAIL_RE, URL_RE};

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

/// The columns needed to authorize changes and manage the photo
#[derive(Debug, Clone, FromRow)]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub photo: String,
    pub user_id: Uuid,
}

/// Create or update body; every field optional so updates can be partial
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootcampInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

pub fn slugify(name: &str) -> String {
    name.to_kebab_case()
}

impl BootcampInput {
    fn normalized(&self) -> Self {
        Self {
            name: trimmed(&self.name),
            description: self.description.clone(),
            website: trimmed(&self.website),
            phone: trimmed(&self.phone),
            email: trimmed(&self.email),
            address: trimmed(&self.address),
            careers: self.careers.clone(),
            ..*self
        }
    }

    fn shared_rules(&self, v: &mut Validator) {
        v.max_chars(self.name.as_deref(), 50, "Name cannot be more than 50 characters")
            .max_chars(self.description.as_deref(), 500, "Description can not be more than 500 characters")
            .matches(self.website.as_deref(), &URL_RE, "URL is invalid (Must include HTTP or HTTPS)")
            .max_chars(self.phone.as_deref(), 20, "Phone number can not be longer than 20 characters")
            .matches(self.email.as_deref(), &EMAIL_RE, "Email is not valid");
        if let Some(careers) = &self.careers {
            v.check(!careers.is_empty(), "At least one career is required");
            for career in careers {
                v.check(
                    CAREERS.contains(&career.as_str()),
                    format!("`{}` is not a valid career", career),
                );
            }
        }
    }

    pub fn validate_create(&self) -> Result<Self, ApiError> {
        let input = self.normalized();
        let mut v = Validator::new();
        v.required(input.name.as_deref(), "Name is required")
            .required(input.description.as_deref(), "Description is required")
            .required(input.address.as_deref(), "Address is required")
            .check(input.careers.is_some(), "Careers are required");
        input.shared_rules(&mut v);
        v.finish()?;
        Ok(input)
    }

    pub fn validate_update(&self) -> Result<Self, ApiError> {
        let input = self.normalized();
        let mut v = Validator::new();
        v.check(input.name.as_deref().map_or(true, |n| !n.is_empty()), "Name is required")
            .check(
                input.description.as_deref().map_or(true, |d| !d.trim().is_empty()),
                "Description is required",
            )
            .check(input.address.as_deref().map_or(true, |a| !a.is_empty()), "Address is required");
        input.shared_rules(&mut v);
        v.finish()?;
        Ok(input)
    }
}

const COLUMNS: &str = "id, name, address, photo, user_id";

impl Bootcamp {
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(ex: E, id: Uuid) -> Result<Option<Bootcamp>, DatabaseError> {
        let sql = format!("SELECT {} FROM bootcamps WHERE id = $1", COLUMNS);
        Ok(sqlx::query_as::<_, Bootcamp>(&sql).bind(id).fetch_optional(ex).await?)
    }

    /// Expects input that passed `validate_create`
    pub async fn insert<'e, E: PgExecutor<'e>>(
        ex: E,
        input: &BootcampInput,
        owner: Uuid,
        location: Option<&GeoLocation>,
    ) -> Result<Uuid, DatabaseError> {
        let name = input.name.as_deref().unwrap_or_default();
        let id = sqlx::query_scalar(
            "INSERT INTO bootcamps (name, slug, description, website, phone, email, address, careers, \
             housing, job_assistance, job_guarantee, accept_gi, user_id, \
             longitude, latitude, formatted_address, street, city, state, zipcode, country) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, \
             $14, $15, $16, $17, $18, $19, $20, $21) RETURNING id",
        )
        .bind(name)
        .bind(slugify(name))
        .bind(input.description.as_deref())
        .bind(input.website.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.email.as_deref())
        .bind(input.address.as_deref())
        .bind(input.careers.clone().unwrap_or_default())
        .bind(input.housing.unwrap_or(false))
        .bind(input.job_assistance.unwrap_or(false))
        .bind(input.job_guarantee.unwrap_or(false))
        .bind(input.accept_gi.unwrap_or(false))
        .bind(owner)
        .bind(location.map(|l| l.longitude))
        .bind(location.map(|l| l.latitude))
        .bind(location.and_then(|l| l.formatted_address.clone()))
        .bind(location.and_then(|l| l.street.clone()))
        .bind(location.and_then(|l| l.city.clone()))
        .bind(location.and_then(|l| l.state.clone()))
        .bind(location.and_then(|l| l.zipcode.clone()))
        .bind(location.and_then(|l| l.country.clone()))
        .fetch_one(ex)
        .await?;
        Ok(id)
    }

    /// Partial update; a new name also refreshes the slug
    pub async fn update<'e, E: PgExecutor<'e>>(ex: E, id: Uuid, input: &BootcampInput) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE bootcamps SET \
             name = COALESCE($2, name), \
             slug = COALESCE($3, slug), \
             description = COALESCE($4, description), \
             website = COALESCE($5, website), \
             phone = COALESCE($6, phone), \
             email = COALESCE($7, email), \
             address = COALESCE($8, address), \
             careers = COALESCE($9, careers), \
             housing = COALESCE($10, housing), \
             job_assistance = COALESCE($11, job_assistance), \
             job_guarantee = COALESCE($12, job_guarantee), \
             accept_gi = COALESCE($13, accept_gi) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.name.as_deref())
        .bind(input.name.as_deref().map(slugify))
        .bind(input.description.as_deref())
        .bind(input.website.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.email.as_deref())
        .bind(input.address.as_deref())
        .bind(input.careers.clone())
        .bind(input.housing)
        .bind(input.job_assistance)
        .bind(input.job_guarantee)
        .bind(input.accept_gi)
        .execute(ex)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the stored location; `None` clears it
    pub async fn set_location<'e, E: PgExecutor<'e>>(
        ex: E,
        id: Uuid,
        location: Option<&GeoLocation>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE bootcamps SET longitude = $2, latitude = $3, formatted_address = $4, street = $5, \
             city = $6, state = $7, zipcode = $8, country = $9 WHERE id = $1",
        )
        .bind(id)
        .bind(location.map(|l| l.longitude))
        .bind(location.map(|l| l.latitude))
        .bind(location.and_then(|l| l.formatted_address.clone()))
        .bind(location.and_then(|l| l.street.clone()))
        .bind(location.and_then(|l| l.city.clone()))
        .bind(location.and_then(|l| l.state.clone()))
        .bind(location.and_then(|l| l.zipcode.clone()))
        .bind(location.and_then(|l| l.country.clone()))
        .execute(ex)
        .await?;
        Ok(())
    }

    pub async fn set_photo<'e, E: PgExecutor<'e>>(ex: E, id: Uuid, photo: &str) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE bootcamps SET photo = $2 WHERE id = $1")
            .bind(id)
            .bind(photo)
            .execute(ex)
            .await?;
        Ok(())
    }

    /// Cascades to the bootcamp's courses and reviews
    pub async fn delete<'e, E: PgExecutor<'e>>(ex: E, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM bootcamps WHERE id = $1").bind(id).execute(ex).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bootcamps of other owners holding courses or reviews by `user_id`
    pub async fn ids_reviewed_or_taught_by<'e, E: PgExecutor<'e>>(ex: E, user_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        Ok(sqlx::query_scalar(
            "SELECT bootcamp_id FROM courses WHERE user_id = $1 \
             UNION SELECT bootcamp_id FROM reviews WHERE user_id = $1 \
             EXCEPT SELECT id FROM bootcamps WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(ex)
        .await?)
    }

    /// ceil(mean tuition / 10) * 10, or NULL without courses
    pub async fn refresh_average_cost<'e, E: PgExecutor<'e>>(ex: E, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE bootcamps SET average_cost = \
             (SELECT CEIL(AVG(tuition) / 10.0) * 10 FROM courses WHERE bootcamp_id = $1) \
             WHERE id = $1",
        )
        .bind(id)
        .execute(ex)
        .await?;
        Ok(())
    }

    /// Mean rating rounded to one decimal, or NULL without reviews
    pub async fn refresh_average_rating<'e, E: PgExecutor<'e>>(ex: E, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE bootcamps SET average_rating = \
             (SELECT ROUND(AVG(rating) * 10) / 10 FROM reviews WHERE bootcamp_id = $1) \
             WHERE id = $1",
        )
        .bind(id)
        .execute(ex)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BootcampInput {
        BootcampInput {
            name: Some("Devworks Bootcamp".into()),
            description: Some("Full stack web development".into()),
            website: Some("https://devworks.com".into()),
            phone: Some("(111) 111-1111".into()),
            email: Some("enroll@devworks.com".into()),
            address: Some("233 Bay State Rd Boston MA 02215".into()),
            careers: Some(vec!["Web Development".into(), "UI/UX".into()]),
            housing: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn slug_is_lowercase_kebab() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("ModernTech Bootcamp"), "modern-tech-bootcamp");
    }

    #[test]
    fn accepts_a_complete_bootcamp() {
        assert!(valid().validate_create().is_ok());
    }

    #[test]
    fn create_requires_core_fields() {
        let err = BootcampInput::default().validate_create().unwrap_err();
        match err {
            ApiError::ValidationError { errors, .. } => assert_eq!(
                errors,
                vec!["Name is required", "Description is required", "Address is required", "Careers are required"]
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_careers_and_bad_urls() {
        let mut input = valid();
        input.careers = Some(vec!["Underwater Basket Weaving".into()]);
        input.website = Some("devworks.com".into());
        let err = input.validate_create().unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn update_may_omit_everything() {
        assert!(BootcampInput::default().validate_update().is_ok());
        let blank = BootcampInput { name: Some("  ".into()), ..Default::default() };
        assert!(blank.validate_update().is_err());
    }
}
