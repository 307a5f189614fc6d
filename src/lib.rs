pub mod application;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod index;
pub mod metadata;
pub mod runtime;
