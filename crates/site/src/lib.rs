//! A2A Labs site library.
//!
//! The landing page, email/password and Google authentication, a route guard
//! and the onboarding wizard. Built as a library so the integration tests can
//! drive the full router against in-memory backends.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod filters;
pub mod guard;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod onboarding;
pub mod routes;
pub mod services;
pub mod state;
