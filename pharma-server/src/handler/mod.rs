//! HTTP request handlers

pub mod auth;
pub mod dashboard;
pub mod extract;

pub use extract::AppJson;
