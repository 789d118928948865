//! Integration test suite for spider
//!
//! End-to-end tests that drive the resolver against the in-memory backend from
//! `spider_cli::test_utils` and run the `spider` binary against temporary projects.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolve**: Resolution scenarios, ordering, cycles and backend failures
//! - **crawl**: Eager crawling and its agreement with on-demand discovery
//! - **cli**: The `spider` binary's commands and exit codes

mod cli;
mod crawl;
mod resolve;
