//! Unit tests - public API of the individual compiler stages
//!
//! Each stage is exercised on its own, without assembling full queries.

mod config_file_tests;
mod rewriter_api_tests;
