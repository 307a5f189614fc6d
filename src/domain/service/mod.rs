pub mod dependents;
pub mod ranking;

pub mod search_service;
pub use search_service::*;
