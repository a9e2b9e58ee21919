mod handlers;
mod worker;

pub use worker::{Engine, EngineWorker};
