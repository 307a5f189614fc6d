//! Domain layer - package model and the search/dependents service.

pub mod model;
pub mod service;
