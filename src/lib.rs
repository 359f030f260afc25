pub mod catalog;
pub mod client;
pub mod commands;
pub mod defines;
pub mod feature;
pub mod manifest;
pub mod orchestrator;
pub mod package;
pub mod runtime;
pub mod settings;
