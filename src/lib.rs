pub mod auth;
pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod geo;
pub mod models;
pub mod queue;
pub mod report;
pub mod session;
pub mod sim;

pub use error::{AppError, Result};
