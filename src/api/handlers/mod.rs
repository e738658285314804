//! API handlers for the admin auth service.

pub mod auth;
pub mod health;
