//! HTTP handlers

pub mod health;
pub mod readings;
pub mod alerts;
