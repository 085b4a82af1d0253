//! Core types and the data-synchronisation layer for the staffing back
//! office.
//!
//! Seven collections (jobs, candidates, employers, applications, employees,
//! teams, schedule events) are each persisted as one JSON document through a
//! pluggable [`backend::Backend`]. A [`repository::Repository`] hands out
//! typed [`store::EntityStore`]s and publishes every mutation on its
//! [`bus::NotificationBus`]; a [`sync::SyncWatcher`] adds notifications for
//! writes made by other processes sharing the backend.
//!
//! This crate is free of HTTP and database dependencies.

pub mod adapter;
pub mod backend;
pub mod bus;
pub mod entity;
pub mod error;
pub mod fallback;
pub mod id;
pub mod model;
pub mod repository;
pub mod store;
pub mod submit;
pub mod sync;
pub mod workflow;

pub use error::{Error, Result};
