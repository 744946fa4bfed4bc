pub mod error;
pub mod models;
pub mod settings;

pub use error::*;
pub use models::*;
pub use settings::*;
