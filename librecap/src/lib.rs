#![forbid(unsafe_code)]

//! # recap
//!
//! The shared code for the playbook recap notifier. Encapsulates:
//!
//! - Accumulation of task timings and per-host results over one run
//! - Rendering of the final recap text
//! - Best-effort delivery of the recap to an ntfy endpoint
//! - Logging and tracing

pub mod log;
pub mod notify;
pub mod render;
pub mod run;
