//! Campus shuttle tracking and arrival estimation.
//!
//! Shuttles drive fixed routes and report their position. This crate keeps
//! each shuttle's position relative to its route up to date and estimates,
//! for every stop, when the shuttle will get there and how far to trust
//! that estimate.

pub mod cache;
pub mod config;
pub mod domain;
pub mod eta;
pub mod matcher;
pub mod notify;
pub mod service;
pub mod speed;
pub mod store;
pub mod topology;
pub mod tracker;
pub mod worker;
