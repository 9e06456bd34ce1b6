//! Core trait abstractions for the intake pipeline.
//!
//! These traits define the seams to the external collaborators: the record
//! store, the file store, the extraction model and the change notifier.
//! Each pipeline component receives them at construction time.

pub mod files;
pub mod model;
pub mod notify;
pub mod store;
