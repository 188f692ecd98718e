pub mod config;
pub mod error;
pub mod feed;
pub mod indicator;
pub mod model;
pub mod notifier;
pub mod pipeline;
pub mod profile;
pub mod strategy;
