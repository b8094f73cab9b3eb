//! Helpers shared by the integration tests.

#[allow(dead_code)]
#[path = "../../src/test_support/socket_guard.rs"]
pub mod socket_guard;
