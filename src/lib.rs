//! Personal finance tracking backend.
//!
//! Users record income and expense transactions, define budgets and
//! savings goals, and receive generated reports and email notifications.
//! The crate is organized as a domain layer of services over storage
//! traits (with a CSV implementation), plus a wall-clock job scheduler
//! for the periodic sweeps.

pub mod config;
pub mod domain;
pub mod jobs;
pub mod storage;
