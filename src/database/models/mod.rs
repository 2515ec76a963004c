pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;
pub mod validate;

pub use bootcamp::{Bootcamp, BootcampInput};
pub use course::{Course, CourseInput};
pub use review::{Review, ReviewInput};
pub use user::{NewUser, Role, User, UserChanges};
