//! Scripted CLI library: command implementations shared by the `scripted`
//! binary and its integration tests.

pub mod commands;
