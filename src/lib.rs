pub mod app;
pub mod auth;
pub mod aws;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod model;
pub mod repository;
pub mod routes;
mod shutdown;
pub mod state;
mod tracing;
