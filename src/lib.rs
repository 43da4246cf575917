pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod import;
pub mod model;
pub mod parsers;
pub mod paths;
pub mod wildcard;
