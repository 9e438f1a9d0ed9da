//! Command implementations.

pub mod classify;
pub mod handle;
pub mod parse;
pub mod put;
pub mod reconcile;
pub mod tag;

pub use self::classify::execute_classify;
pub use self::handle::{execute_handle, is_test_event, read_event};
pub use self::parse::{execute_key, execute_parse};
pub use self::put::execute_put;
pub use self::reconcile::{execute_reconcile, execute_watch};
pub use self::tag::execute_tag;
