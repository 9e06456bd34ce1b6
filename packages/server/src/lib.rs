// Shipment Intake - API Core
//
// Thin HTTP surface over the intake pipeline: document parsing, upload
// ingestion, the searchable shipment table, monitoring and a change stream.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::*;
