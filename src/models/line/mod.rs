//! Incremental construction of a single transit line.
pub mod line_action;
pub mod line_config;
pub mod line_env;
pub mod line_reward;
