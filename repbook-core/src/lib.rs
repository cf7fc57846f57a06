pub mod db;
pub mod error;
pub mod logging;
pub mod store;

pub use db::models;
pub use error::{Result, StoreError};
pub use store::{WorkoutStore, store};
