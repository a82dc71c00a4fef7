//! Error Types
//!
//! This module defines the error type used throughout the update engine.
//!
//! # Overview
//!
//! The main error type [`Error`] covers every failure mode a [`crate::controller::Controller`]
//! pass can surface:
//! - configuration mistakes (a scene or context never attached)
//! - cooperative cancellation of a background pass
//! - failures bubbled up from the embedder's upstream scene implementation
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`.

use thiserror::Error;

/// The error type for the update engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A pass was requested before [`crate::controller::Controller::set_scene`]
    /// and [`crate::controller::Controller::set_context`] were both called.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The in-flight pass observed a cancellation request. Dirty state is
    /// preserved so the next pass resumes where this one left off.
    #[error("update cancelled")]
    Cancelled,

    /// The upstream scene implementation failed while evaluating some
    /// location. Not surfaced for backend-retag refusals, which are handled
    /// locally by rebuilding the object (see [`crate::renderer::ObjectHandle::set_attributes`]).
    #[error("upstream scene error: {0}")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
