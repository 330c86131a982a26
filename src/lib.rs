pub mod alerts;
pub mod analysis;
pub mod config;
pub mod detail;
pub mod events;
pub mod generator;
pub mod map;
pub mod policy;
pub mod portfolio;
pub mod presentation;
pub mod session;
pub mod signup;
pub mod types;
