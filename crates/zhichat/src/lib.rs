pub mod cli;
pub mod log;
pub mod ux;
pub mod web;
