//! Tests for gitdiagram-protocol.

mod subject_tests;
