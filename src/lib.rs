pub mod catalog;
pub mod commands;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod page;
pub mod reconcile;
pub mod run;
pub mod runtime;
pub mod sniff;
pub mod version;
