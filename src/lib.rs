pub mod app;
pub mod cli;
pub mod config;
pub mod controller;
pub mod fetch;
pub mod form;
pub mod format;
pub mod output;
pub mod page;
pub mod session;
pub mod slider;
pub mod utils;

#[cfg(test)]
mod tests;
