mod cancellation;
mod file_handle;
mod pending_fetch;
mod reader;
mod reader_cursor;

pub use cancellation::*;
pub use file_handle::*;
pub use pending_fetch::*;
pub use reader::*;
pub use reader_cursor::*;
