//! Role and permission based access control with validation and audit
//! around every mutation, for a vehicle inventory and messaging admin.
pub mod access;
pub mod app;
pub mod audit;
pub mod auth;
pub mod cars;
pub mod config;
pub mod error;
pub mod hooks;
pub mod messages;
pub mod model;
pub mod state;
pub mod store;
pub mod users;
pub mod validation;
