//! Mulch Core Library
//!
//! Core pruning logic for the mulch conversation-log pruner: record
//! loading, dependency graph construction, temporal decay and importance
//! scoring, dependency-aware deletion resolution, integrity validation,
//! and per-file orchestration with crash-safe write-back.

pub mod batch;
pub mod config;
pub mod decay;
pub mod error;
pub mod graph;
pub mod integrity;
pub mod logging;
pub mod prune;
pub mod record;
pub mod resolve;
pub mod score;
