#![doc = "The `jobboard` library crate."]
#![doc = ""]
#![doc = "Domain models, persistence, authorization policy, services and the HTTP"]
#![doc = "routing for the job board. The binary (`main.rs`) wires these together"]
#![doc = "and runs the server."]

pub mod auth;
pub mod config;
pub mod error;
pub mod files;
pub mod models;
pub mod notify;
pub mod policy;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
