//! Router Module Index
//!
//! Splits the routes by who may call them. Access control is applied per module in
//! `create_router`, so an endpoint cannot end up public by accident.

/// Routes open to everyone (anonymous readers included).
pub mod public;

/// Routes behind the admin guard.
pub mod admin;
