pub mod config_check;
pub mod generate;
pub mod serve;
