//! API handlers module

pub mod analysis;
pub mod auth;
pub mod health;
pub mod recommendations;
pub mod reports;
pub mod reviews;
