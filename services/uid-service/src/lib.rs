//! Unique identifier (Surrogate) service.
//!
//! This crate primarily ships a `uid-service` binary, but exposes its
//! modules as a library to enable integration testing.

pub mod api;
pub mod config;
pub mod filter;
pub mod generator;
pub mod model;
pub mod service;
pub mod state;
pub mod store;
