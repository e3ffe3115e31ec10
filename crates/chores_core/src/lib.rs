pub mod clock;
pub mod config;
pub mod error;
pub mod job;
pub mod model;
pub mod notify;
pub mod reminder;
pub mod reset;
pub mod store;
pub mod task_api;

#[cfg(test)]
mod testing;
