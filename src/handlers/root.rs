use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::DatabaseManager;

/// GET / - API description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Bootcamp Directory API",
            "version": version,
            "description": "Bootcamps, courses, reviews and users with filtered, paginated listings",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/v1/auth/* (register, login, me, updateinfo, updatepassword, forgotpassword, resetpassword)",
                "bootcamps": "/api/v1/bootcamps[/:id] (public read, publisher/admin write)",
                "radius": "/api/v1/bootcamps/radius/:zipcode/:distance (public)",
                "photo": "/api/v1/bootcamps/:id/photo (publisher/admin)",
                "courses": "/api/v1/courses[/:id], /api/v1/bootcamps/:id/courses",
                "reviews": "/api/v1/reviews[/:id], /api/v1/bootcamps/:id/reviews",
                "users": "/api/v1/users[/:id] (admin)",
            },
            "query": {
                "filter": "field=value, field[lt|lte|gt|gte|in]=value",
                "select": "select=name,description",
                "sort": "sort=-createdAt,name",
                "page": "page=2&limit=10",
            }
        }
    }))
}

/// GET /health - database ping
pub async fn health(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}
