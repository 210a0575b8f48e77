mod fetch_scheduler;
mod http_transport;
mod range_fetcher;
mod transport;

pub use fetch_scheduler::*;
pub use http_transport::*;
pub use range_fetcher::*;
pub use transport::*;
