pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod grading;
pub mod mail;
pub mod models;
pub mod services;
pub mod state;
pub mod validate;
