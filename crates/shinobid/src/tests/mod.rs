//! Test suites for the server bootstrap and process lifecycle.

mod process_behaviour;
pub(crate) mod support;
