//! The generic, file-backed record table.

mod observer;
mod row;
#[allow(clippy::module_inception)]
mod table;

pub use self::observer::Observer;
pub use self::row::Row;
pub use self::table::Table;
