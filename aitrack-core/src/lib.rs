//! # aitrack-core
//!
//! Embedded change tracking for AI-edited directory trees.
//!
//! Records file mutations performed by an automated agent inside
//! subdirectories of a larger installation (plugin/theme-style trees) and
//! makes them reviewable, revertible, and exportable — without shelling
//! out to an external version-control binary. Each tracked directory owns
//! a self-contained content-addressable repository with two branches: a
//! pristine `main` baseline and a running `ai-changes` line of edits.

pub mod diff;
pub mod error;
pub mod export;
pub mod lock;
pub mod manager;
pub mod models;
pub mod object;
pub mod repo;
pub mod tracker;
pub mod tree;

pub use error::{Error, Result};
pub use manager::TrackerManager;
pub use models::{ChangeKind, ChangeRecord, DirectoryChanges};
pub use tracker::Tracker;
