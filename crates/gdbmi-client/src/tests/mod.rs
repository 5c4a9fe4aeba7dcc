//! Test suites for the debugger session.

mod support;
mod unit;
