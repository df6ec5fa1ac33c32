//! Image transforms and the pipeline executor that runs them

pub mod base;
pub mod helpers;
pub mod job;
pub mod runner;
