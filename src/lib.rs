pub mod aggregate;
pub mod app;
pub mod cli;
pub mod config;
pub mod export;
pub mod filter;
pub mod model;
pub mod output;
pub mod store;
pub mod tracker;
pub mod utils;

#[cfg(test)]
mod tests;
