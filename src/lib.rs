pub mod api;
pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
