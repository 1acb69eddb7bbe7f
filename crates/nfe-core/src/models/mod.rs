//! Data models shared by the extraction and aggregation stages.

pub mod config;
pub mod document;
pub mod report;
