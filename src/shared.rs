pub mod types;
pub mod settings;
pub mod errors;
pub mod events;

pub use errors::{EngineError, EngineResult};
