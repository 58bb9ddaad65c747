mod assets;
mod provider;
#[cfg(test)]
mod test_utils;

pub mod completion;
pub mod config;
pub mod history;
pub mod model;
pub mod prompt;
pub mod session;
pub mod sink;

pub use crate::assets::{get_config_dir, get_data_dir};
pub use crate::provider::llm::get_completion_llm;
