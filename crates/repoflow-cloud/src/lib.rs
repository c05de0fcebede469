//! RepoFlow managed task scheduling
//!
//! This crate provides the scheduler abstraction used to run a published
//! image as a remote task, and the launcher that turns a scheduled task
//! into a reachable endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   repoflowd                      │
//! │                 (POST /project)                  │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                repoflow-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  TaskLauncher (run + poll with backoff)   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait TaskScheduler { ... }              │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │      ECS      │
//!           │  (cloud-aws)  │
//!           └───────────────┘
//! ```

pub mod error;
pub mod launcher;
pub mod provider;

// Re-exports
pub use error::{CloudError, Result};
pub use launcher::{LaunchedTask, TaskLauncher};
pub use provider::{
    ContainerSnapshot, NetworkBinding, RunTaskRequest, TaskScheduler, TaskSnapshot,
};
