//! Run-and-verify core for Enterprise Guide projects.
//!
//! The crate owns the state machine that drives an automation host through
//! open → run → save → close, extracts the run logs of the saved artifact and
//! classifies them. Concrete hosts and extractors live in `egrun-plugins`;
//! everything here talks to them through the traits in [`host`] and
//! [`extract`].

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod events_out;
pub mod extract;
pub mod host;
pub mod request;
pub mod runner;
