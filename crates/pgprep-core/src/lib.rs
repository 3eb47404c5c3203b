pub mod config;
pub mod execution;
pub mod models;
pub mod persistence;
pub mod sources;
pub mod workflow;
