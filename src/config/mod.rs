//! config/mod.rs

pub mod grading_config;
