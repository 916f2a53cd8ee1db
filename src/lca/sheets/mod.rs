pub mod activities;
pub mod error;
pub mod expr;
pub mod foreground;
pub mod framework;
pub mod io;
pub mod model;
pub mod outcome;
pub mod params;
pub mod pipeline;
pub mod registry;
pub mod resolve;

pub use error::{IngestError, Result};
