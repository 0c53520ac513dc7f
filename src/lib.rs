pub mod billing;
pub mod config;
pub mod customers;
pub mod db;
pub mod error;
pub mod routes;
pub mod timestamp;
