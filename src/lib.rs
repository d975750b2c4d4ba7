pub mod record;
pub mod context;
pub mod anonymize;
pub mod processor;
pub mod enricher;
pub mod formatter;
pub mod pipeline;
pub mod sink;
pub mod layer;

#[cfg(feature = "elastic")]
pub mod elastic;

pub mod file_sink;
pub mod noop_sink;
pub mod backend;
pub mod init;
pub mod env;
