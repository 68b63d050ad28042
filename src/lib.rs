//! Outreach
//!
//! Outreach plans a marketing campaign: it decides how many items of each product category to
//! send to each customer record so that expected revenue is maximised, subject to aggregate
//! category bounds, category couplings and a per-record capacity. The plan is solved as an
//! integer linear program and the solved model is persisted in CPLEX LP format.

pub mod categories;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod fixtures;
pub mod observability;
pub mod pipeline;
pub mod prelude;
pub mod profiles;
pub mod report;
pub mod solvers;
pub mod volumes;
