//! Crate-level tests for the record grammar.
