pub mod config;
pub mod decision;
pub mod engine;
pub mod errors;
pub mod model;
pub mod providers;
pub mod report;
pub mod score;
pub mod storage;
