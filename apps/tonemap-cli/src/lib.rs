//! Support code for the `tonemap` binary.

pub mod ingest;
