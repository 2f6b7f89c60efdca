//! okr-core: domain logic for the okr objectives and key results tracker.
//!
//! This crate owns the data model, progress engine, local-first storage,
//! remote document store adapter, sign-in sync, and the mutation services.

pub mod config;
pub mod core;
pub mod dashboard;
pub mod identity;
pub mod local;
pub mod model;
pub mod outbox;
pub mod progress;
pub mod remote;
pub mod sync;
