use serde::Deserialize;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::error::ApiError;

use super::validate::{trimmed, Validator};

#[derive(Debug, Clone, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub bootcamp_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidReview {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i32>,
}

impl ReviewInput {
    fn rules(&self, v: &mut Validator) -> ValidReview {
        let review = ValidReview {
            title: trimmed(&self.title),
            text: self.text.clone(),
            rating: self.rating.filter(|r| r.is_finite()).map(|r| r.round() as i32),
        };
        v.max_chars(review.text.as_deref(), 1000, "review can not be more than 1000 characters long.")
            .check(
                self.rating.is_none() || review.rating.is_some_and(|r| (1..=10).contains(&r)),
                "rating must be between 1-10",
            );
        review
    }

    pub fn validate_create(&self) -> Result<ValidReview, ApiError> {
        let mut v = Validator::new();
        v.required(self.title.as_deref(), "title is required")
            .required(self.text.as_deref(), "text is required")
            .check(self.rating.is_some(), "rating is required.");
        let review = self.rules(&mut v);
        v.finish()?;
        Ok(review)
    }

    pub fn validate_update(&self) -> Result<ValidReview, ApiError> {
        let mut v = Validator::new();
        v.check(self.title.as_deref().map_or(true, |t| !t.trim().is_empty()), "title is required")
            .check(self.text.as_deref().map_or(true, |t| !t.trim().is_empty()), "text is required");
        let review = self.rules(&mut v);
        v.finish()?;
        Ok(review)
    }
}

impl Review {
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(ex: E, id: Uuid) -> Result<Option<Review>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, Review>("SELECT id, bootcamp_id, user_id FROM reviews WHERE id = $1")
                .bind(id)
                .fetch_optional(ex)
                .await?,
        )
    }

    pub async fn exists_for<'e, E: PgExecutor<'e>>(ex: E, bootcamp_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reviews WHERE bootcamp_id = $1 AND user_id = $2)")
                .bind(bootcamp_id)
                .bind(user_id)
                .fetch_one(ex)
                .await?,
        )
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(
        ex: E,
        bootcamp_id: Uuid,
        user_id: Uuid,
        review: &ValidReview,
    ) -> Result<Uuid, DatabaseError> {
        let id = sqlx::query_scalar(
            "INSERT INTO reviews (title, text, rating, bootcamp_id, user_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(review.title.as_deref())
        .bind(review.text.as_deref())
        .bind(review.rating)
        .bind(bootcamp_id)
        .bind(user_id)
        .fetch_one(ex)
        .await?;
        Ok(id)
    }

    pub async fn update<'e, E: PgExecutor<'e>>(ex: E, id: Uuid, review: &ValidReview) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE reviews SET title = COALESCE($2, title), text = COALESCE($3, text), \
             rating = COALESCE($4, rating) WHERE id = $1",
        )
        .bind(id)
        .bind(review.title.as_deref())
        .bind(review.text.as_deref())
        .bind(review.rating)
        .execute(ex)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(ex: E, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(ex).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_is_rounded_then_range_checked() {
        let review = ReviewInput {
            title: Some("Learned a ton!".into()),
            text: Some("Great bootcamp".into()),
            rating: Some(8.5),
        }
        .validate_create()
        .unwrap();
        assert_eq!(review.rating, Some(9));

        let input = ReviewInput { rating: Some(10.6), ..Default::default() };
        assert!(input.validate_update().is_err());
        let input = ReviewInput { rating: Some(0.4), ..Default::default() };
        assert!(input.validate_update().is_err());
    }

    #[test]
    fn text_is_limited() {
        let input = ReviewInput { text: Some("x".repeat(1001)), ..Default::default() };
        assert!(input.validate_update().is_err());
    }
}
