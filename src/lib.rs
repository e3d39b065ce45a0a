pub mod cli;
pub mod commands;
pub mod pecat;
pub mod utils;
