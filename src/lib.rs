//! Buildstall - causal reconstruction of distributed build logs
//!
//! This library rebuilds the project/context/task graph of a multi-node
//! build from its event stream, reports consistency violations, and finds
//! call-out tasks that sat idle waiting on projects whose results were
//! served from cache.

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod event;
pub mod event_log;
pub mod json_output;
pub mod linker;
pub mod outcome;
pub mod pipeline;
pub mod reconstruct;
pub mod registry;
pub mod stall;
pub mod text_output;
pub mod timeline;
pub mod tree;
pub mod violation;
