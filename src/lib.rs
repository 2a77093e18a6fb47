//! Synthetic download traffic with throughput reporting.
//!
//! Targets come from two URL lists: websites, which are fetched together
//! with a random sample of their links, and large files, which are streamed.
//! Each target produces one report row with its host's IP and country, the
//! amount transferred and the average speed in Mbps.

pub mod cli;
pub mod config;
pub mod controller;
pub mod crawler;
pub mod downloader;
pub mod error;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod sink;
pub mod types;
