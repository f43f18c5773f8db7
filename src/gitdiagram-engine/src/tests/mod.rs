//! Tests for gitdiagram-engine.

mod cache_tests;
mod parser_tests;
