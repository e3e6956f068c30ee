//! Library entrypoint: re‑export modules

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod db_utils;
pub mod errors;
pub mod fetcher;
pub mod ingestor;
pub mod reader;
pub mod writer;
