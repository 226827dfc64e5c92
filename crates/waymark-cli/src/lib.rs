//! Waymark CLI library.
//!
//! Helpers shared by the subcommands: how network lines are weighed, how
//! coordinates are parsed from the command line, and how routes are printed.

pub mod network;
pub mod output;
