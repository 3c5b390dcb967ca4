//! Wire contracts between the scheduler, collection workflows and ingestion.

pub mod core;
pub mod responses;
pub mod storage;
pub mod triggers;
