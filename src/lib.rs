//! Install Watch - Tails installer logs and reports how installation ended.

pub mod config;
pub mod display;
pub mod install;
pub mod watcher;
