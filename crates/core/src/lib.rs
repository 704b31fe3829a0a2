//! A2A Labs Core - Shared types library.
//!
//! This crate provides the domain types used across the A2A Labs components:
//! - `site` - Landing site, authentication pages and onboarding wizard
//! - `cli` - Command-line tools for session store migrations
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for user IDs, emails, usernames and the
//!   onboarding profile with its choice enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
