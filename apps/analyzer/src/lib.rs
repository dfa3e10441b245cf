//! Customer fit analyzer: scores a sales-call transcript against the ideal
//! customer profile and surfaces comparable historical customers.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod criteria_provider;
pub mod errors;
pub mod history;
pub mod llm_client;
pub mod models;
pub mod recovery;
pub mod retry;
pub mod scoring;
pub mod similarity;
