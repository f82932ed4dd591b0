//! Unit tests for the task hierarchy.

pub(crate) mod support;

mod lifecycle_service_tests;
