mod engine;
mod error;

pub use engine::{Engine, Session};
pub use error::CoreError;
