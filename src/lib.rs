pub mod audit;
pub mod auth;
pub mod backups;
pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod templates_structs;
