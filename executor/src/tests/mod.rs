//! Test modules for the executor crate

mod support;

mod registration_tests;
mod server_tests;
