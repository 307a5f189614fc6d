//! Application layer - Use cases that coordinate domain services.
//!
//! This layer sits between the CLI commands and the search service.

mod import;

pub use import::{ImportSummary, ImportUseCase};
