pub mod classify;
pub mod config;
pub mod grid;
pub mod similarity;
pub mod wmd;
