// Library root for the elicitation relay

pub mod api;
pub mod capability;
pub mod config;
pub mod core;
pub mod flow;
pub mod protocol;
pub mod requester;
pub mod transfer;
