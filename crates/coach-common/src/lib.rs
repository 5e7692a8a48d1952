pub mod api;
pub mod error;

pub use reqwest::StatusCode;
