pub mod classify;
pub mod compose;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod exec;
pub mod extension;
pub mod io;
pub mod paths;
pub mod session;
pub mod state;
pub mod status;
pub mod step;
pub mod story;
pub mod validate;

pub use error::{LoopError, Result};
