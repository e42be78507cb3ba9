//! # Gauntlet Core
//!
//! Shared logic for the Gauntlet boss-encounter engine: data models,
//! submission fingerprinting, rubric validation, the hint unlock policy,
//! store abstractions, and the grading and progression coordinators.
//!
//! This crate contains no tokio, sqlx, network, or filesystem
//! dependencies. Persistence backends and grader adapters live in the
//! `gauntlet` engine crate.

pub mod fingerprint;
pub mod grade;
pub mod grader;
pub mod models;
pub mod policy;
pub mod progress;
pub mod rubric;
pub mod store;
