pub mod catalog;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod orientation;
pub mod pagination;
pub mod paths;
pub mod report;
pub mod scanner;
pub mod session;
pub mod thumbnail;
