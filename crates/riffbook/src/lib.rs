//! `riffbook` - A practice tracker for guitar technique progress
//!
//! This library provides the reference catalog of instructors and techniques,
//! per-user practice plans and daily progress entries kept in a live document
//! store, and the statistics and reports derived from them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod identity;
pub mod legacy;
pub mod logger;
pub mod logging;
pub mod model;
pub mod plans;
pub mod stats;
pub mod storage;
pub mod store;
pub mod tracker;

pub use config::Config;
pub use error::{Error, Result};
pub use identity::{AuthFailureReason, UserSession};
pub use logger::{ProgressLogger, SaveOutcome};
pub use logging::init_logging;
pub use model::{MetricValues, PartialUpdate, Plan, ProgressEntry, UserData};
pub use storage::{Storage, StorageStats};
pub use store::{ProgressStore, SqliteStore, Subscription};
pub use tracker::Tracker;
