use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Extension, Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::{AppConfig, Environment, CONFIG};
use crate::database::schema::{CollectionSchema, BOOTCAMPS, COURSES, REVIEWS, USERS};
use crate::database::Repository;
use crate::handlers;
use crate::middleware::require_auth;
use crate::services::{build_geocoder, Geocoder, LogMailer, Mailer, PhotoStore};

/// Shared per-process state handed to every handler as an `Extension`
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub geocoder: Arc<dyn Geocoder>,
    pub mailer: Arc<dyn Mailer>,
    pub photos: Arc<PhotoStore>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        geocoder: Arc<dyn Geocoder>,
        mailer: Arc<dyn Mailer>,
        photos: PhotoStore,
    ) -> Self {
        Self {
            pool,
            geocoder,
            mailer,
            photos: Arc::new(photos),
        }
    }

    /// Wire the configured collaborators around an existing pool
    pub fn from_config(pool: PgPool, config: &AppConfig) -> Self {
        Self::new(
            pool,
            build_geocoder(&config.geocoder),
            Arc::new(LogMailer::new(&config.mail)),
            PhotoStore::from_config(&config.upload),
        )
    }

    fn repository(&self, schema: &'static CollectionSchema) -> Repository {
        Repository::new(schema, self.pool.clone())
    }

    pub fn bootcamps(&self) -> Repository {
        self.repository(&BOOTCAMPS)
    }

    pub fn courses(&self) -> Repository {
        self.repository(&COURSES)
    }

    pub fn reviews(&self) -> Repository {
        self.repository(&REVIEWS)
    }

    pub fn users(&self) -> Repository {
        self.repository(&USERS)
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health))
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth_routes())
                .merge(bootcamp_routes())
                .merge(course_routes())
                .merge(review_routes())
                .merge(user_routes()),
        )
        // Global middleware
        .layer(DefaultBodyLimit::max(CONFIG.api.max_request_size_bytes))
        .layer(Extension(state))
        .layer(cors_layer(&CONFIG))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
}

fn auth_routes() -> Router {
    use handlers::auth;

    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/forgotpassword", post(auth::forgot_password))
        .route("/auth/resetpassword/:resettoken", put(auth::reset_password));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/updateinfo", put(auth::update_info))
        .route("/auth/updatepassword", put(auth::update_password))
        .route_layer(middleware::from_fn(require_auth));

    public.merge(protected)
}

fn bootcamp_routes() -> Router {
    use handlers::{bootcamps, courses, reviews};

    let public = Router::new()
        .route("/bootcamps", get(bootcamps::list))
        .route("/bootcamps/:id", get(bootcamps::show))
        .route("/bootcamps/radius/:zipcode/:distance", get(bootcamps::within_radius))
        .route("/bootcamps/:id/courses", get(courses::for_bootcamp))
        .route("/bootcamps/:id/reviews", get(reviews::for_bootcamp));

    let protected = Router::new()
        .route("/bootcamps", post(bootcamps::create))
        .route("/bootcamps/:id", put(bootcamps::update).delete(bootcamps::delete))
        .route("/bootcamps/:id/photo", put(bootcamps::upload_photo).delete(bootcamps::delete_photo))
        .route("/bootcamps/:id/courses", post(courses::create))
        .route("/bootcamps/:id/reviews", post(reviews::create))
        .route_layer(middleware::from_fn(require_auth));

    public.merge(protected)
}

fn course_routes() -> Router {
    use handlers::courses;

    let public = Router::new()
        .route("/courses", get(courses::list))
        .route("/courses/:id", get(courses::show));

    let protected = Router::new()
        .route("/courses/:id", put(courses::update).delete(courses::delete))
        .route_layer(middleware::from_fn(require_auth));

    public.merge(protected)
}

fn review_routes() -> Router {
    use handlers::reviews;

    let public = Router::new()
        .route("/reviews", get(reviews::list))
        .route("/reviews/:id", get(reviews::show));

    let protected = Router::new()
        .route("/reviews/:id", put(reviews::update).delete(reviews::delete))
        .route_layer(middleware::from_fn(require_auth));

    public.merge(protected)
}

fn user_routes() -> Router {
    use handlers::users;

    // Admin only; the role check happens in each handler
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id", get(users::show).put(users::update).delete(users::delete))
        .route_layer(middleware::from_fn(require_auth))
}
