//! Background Tasks Module
//!
//! Contains the tasks that run alongside a cache manager.
//!
//! # Tasks
//! - Snapshot: Persists cache contents after changes, debounced by the save frequency

mod snapshot;

pub(crate) use snapshot::spawn_snapshot_task;
