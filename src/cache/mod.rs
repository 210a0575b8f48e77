mod fetch_order_replacer;
mod page;
mod page_cache;

pub use fetch_order_replacer::*;
pub use page::*;
pub use page_cache::*;
