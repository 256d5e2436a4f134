pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use client::{HttpMoodleApi, MoodleApi};
pub use config::ClientConfig;
pub use error::AppError;
pub use state::AppState;
