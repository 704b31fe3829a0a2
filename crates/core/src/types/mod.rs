//! Core types for A2A Labs.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod profile;
pub mod username;

pub use email::{Email, EmailError};
pub use id::*;
pub use profile::*;
pub use username::{Username, UsernameError};
