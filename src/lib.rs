pub mod error;
pub mod generator;

pub use error::IconError;
pub use generator::{GeneratedIcon, IconGenerator, TARGET_SIZES};
