pub mod cli;
pub mod commands;
pub mod output;
pub mod telemetry;
