pub mod config;
pub mod logging;

pub mod clock;
pub mod control;
pub mod fetch;
pub mod ids;
pub mod output;
pub mod placeholder;
pub mod rate_limit;
pub mod request;
pub mod retry;
pub mod scheduler;
pub mod transport;
