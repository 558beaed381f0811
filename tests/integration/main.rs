//! Integration tests against a running server (`cargo test -- --ignored`)

mod api_tests;
