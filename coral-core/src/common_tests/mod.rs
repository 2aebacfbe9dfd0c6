//! Generic test suites shared by the unit and integration tests.
//!
//! Each suite is a plain function over the structure under test, so the same
//! checks run under every guard and back-off combination.

pub mod ordered_set_tests;
