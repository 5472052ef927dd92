//! Count aggregation and report assembly.
//!
//! This module groups observation tuples into report rows, sums their
//! counts per selected category, attaches the expected-record checksum of
//! each row, and assembles the finished [`report::Report`].

pub mod aggregate;
pub mod coverage;
pub mod report;
pub mod types;
