//! Configuration, filesystem paths and logging bootstrap for the edge
//! delivery pipeline.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{edge_base_url_for, Config, DEFAULT_EDGE_DOMAIN, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service};
pub use paths::Paths;
