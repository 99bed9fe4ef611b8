//! Cross-module tests for the binary: whole refresh cycles against the
//! simulated backends.

mod pipeline_tests;
