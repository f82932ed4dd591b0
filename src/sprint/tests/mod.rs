//! Unit tests for sprint planning.
