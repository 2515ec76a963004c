use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub listing: ListingConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub upload: UploadConfig,
    pub geocoder: GeocoderConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Page size used when a list request carries no usable `limit`
    pub default_limit: i64,
    pub max_limit: Option<i64>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
    /// Base URL used when building links sent outside the API (password reset mails)
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub reset_token_expiry_minutes: i64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub path: String,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeocoderProvider {
    Disabled,
    MapQuest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub provider: GeocoderProvider,
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub from_name: String,
    pub from_email: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Listing overrides
        if let Ok(v) = env::var("LISTING_DEFAULT_LIMIT") {
            self.listing.default_limit = v.parse().unwrap_or(self.listing.default_limit);
        }
        if let Ok(v) = env::var("LISTING_MAX_LIMIT") {
            self.listing.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("LISTING_DEBUG_LOGGING") {
            self.listing.debug_logging = v.parse().unwrap_or(self.listing.debug_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Some(port) = env::var("API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_PUBLIC_URL") {
            self.api.public_url = v.trim_end_matches('/').to_string();
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_RESET_TOKEN_EXPIRY_MINUTES") {
            self.security.reset_token_expiry_minutes =
                v.parse().unwrap_or(self.security.reset_token_expiry_minutes);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Upload overrides
        if let Ok(v) = env::var("IMAGE_UPLOAD_PATH") {
            self.upload.path = v;
        }
        if let Ok(v) = env::var("IMAGE_UPLOAD_MAX") {
            self.upload.max_bytes = v.parse().unwrap_or(self.upload.max_bytes);
        }

        // Geocoder overrides
        if let Ok(v) = env::var("GEOCODER_PROVIDER") {
            self.geocoder.provider = match v.to_ascii_lowercase().as_str() {
                "mapquest" => GeocoderProvider::MapQuest,
                _ => GeocoderProvider::Disabled,
            };
        }
        if let Ok(v) = env::var("GEOCODER_API_KEY") {
            self.geocoder.api_key = Some(v);
        }
        if let Ok(v) = env::var("GEOCODER_BASE_URL") {
            self.geocoder.base_url = v;
        }

        // Mail overrides
        if let Ok(v) = env::var("FROM_NAME") {
            self.mail.from_name = v;
        }
        if let Ok(v) = env::var("FROM_EMAIL") {
            self.mail.from_email = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            listing: ListingConfig {
                default_limit: 25,
                max_limit: Some(1000),
                debug_logging: true,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3004,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                public_url: "http://localhost:3004".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 30,
                reset_token_expiry_minutes: 10,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            upload: UploadConfig {
                path: "./public/uploads".to_string(),
                max_bytes: 1_000_000,
            },
            geocoder: GeocoderConfig {
                provider: GeocoderProvider::Disabled,
                api_key: None,
                base_url: "https://www.mapquestapi.com/geocoding/v1/address".to_string(),
            },
            mail: MailConfig {
                from_name: "DevCamper".to_string(),
                from_email: "noreply@devcamper.local".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            listing: ListingConfig {
                default_limit: 25,
                max_limit: Some(500),
                debug_logging: false,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3004,
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
                public_url: "https://staging.example.com".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                reset_token_expiry_minutes: 10,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            upload: UploadConfig {
                path: "./public/uploads".to_string(),
                max_bytes: 1_000_000,
            },
            geocoder: GeocoderConfig {
                provider: GeocoderProvider::MapQuest,
                api_key: None,
                base_url: "https://www.mapquestapi.com/geocoding/v1/address".to_string(),
            },
            mail: MailConfig {
                from_name: "DevCamper".to_string(),
                from_email: "noreply@staging.example.com".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            listing: ListingConfig {
                default_limit: 25,
                max_limit: Some(100),
                debug_logging: false,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            api: ApiConfig {
                port: 3004,
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                public_url: "https://app.example.com".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                reset_token_expiry_minutes: 10,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            upload: UploadConfig {
                path: "./public/uploads".to_string(),
                max_bytes: 1_000_000,
            },
            geocoder: GeocoderConfig {
                provider: GeocoderProvider::MapQuest,
                api_key: None,
                base_url: "https://www.mapquestapi.com/geocoding/v1/address".to_string(),
            },
            mail: MailConfig {
                from_name: "DevCamper".to_string(),
                from_email: "noreply@example.com".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
