//! Extraction model implementations.
//!
//! Reference implementations of [`ExtractionModel`](crate::traits::model::ExtractionModel).
//! Users can use these directly or implement their own.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAIModel;
