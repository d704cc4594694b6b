pub mod collect;
pub mod config;
pub mod consts;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod generator;
mod input;
pub mod prompts;
pub mod rules;
pub mod tasks;
