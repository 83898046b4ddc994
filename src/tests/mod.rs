//! Integration-level tests exercising the public API end to end.

mod compiler_tests;
mod roundtrip_tests;
