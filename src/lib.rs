pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod planner;
pub mod routes;
pub mod services;
pub mod state;
