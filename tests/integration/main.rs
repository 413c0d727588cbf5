//! Integration test suite
//!
//! All integration tests compile into one binary; shared helpers live in
//! `common`.

mod common;
mod crawl_tests;
mod fetcher_tests;
