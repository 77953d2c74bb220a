//! Test suites for the Gadget daemon.

pub(crate) mod support;
mod unit;
