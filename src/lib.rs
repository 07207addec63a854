pub mod config;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod limit;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod server;
pub mod stats;
