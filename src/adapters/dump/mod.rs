//! External dump tool integration
//!
//! [`DumpTool`] is the seam between the export core and the process that
//! actually produces SQL. [`MysqlDump`] drives `mysqldump`; tests plug in
//! scripted implementations.

pub mod mysqldump;
pub mod traits;

pub use mysqldump::MysqlDump;
pub use traits::{DumpRequest, DumpTool};
