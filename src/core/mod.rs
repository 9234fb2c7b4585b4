// Core domain: errors, models and the trace token

pub mod errors;
pub mod models;
pub mod trace;
