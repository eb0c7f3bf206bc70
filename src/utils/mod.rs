pub mod errors;
pub mod format;
pub mod table;

pub use errors::{load_failed_message, status_hint};
pub use table::Table;
