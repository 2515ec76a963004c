pub mod geocoder;
pub mod mailer;
pub mod photos;

pub use geocoder::{build_geocoder, GeoLocation, Geocoder, GeocodeError};
pub use mailer::{Email, LogMailer, MailError, Mailer};
pub use photos::{PhotoError, PhotoStore};
