pub mod browser;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod remote;
pub mod report;
pub mod reporter;
pub mod session;
pub mod util;
pub mod verifier;
