//! Account Aggregator sandbox
//!
//! Consent and data-fetch session lifecycles of an account aggregator,
//! with the payload generator and the HTTP surface around them. All
//! modules are public so the integration tests can drive them directly.

pub mod auth;
pub mod consent;
pub mod directory;
pub mod entities;
pub mod errors;
pub mod model;
pub mod payload;
pub mod repository;
pub mod resource;
pub mod session;
pub mod settings;
pub mod storage;
pub mod validation;
pub mod web;
