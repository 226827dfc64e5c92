//! Subcommand handlers dispatched from `main.rs`.

pub mod inspect;
pub mod preprocess;
pub mod route;
