//! External system integrations for quarry.
//!
//! - [`dump`] - The external dump tool (`mysqldump`)
//! - [`catalog`] - Table listing and row selection (`mysql` client plus a
//!   selection manifest)
//! - [`process`] - Child process plumbing shared by both
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external tools and
//! enable testing with scripted implementations. The export core only sees
//! the [`dump::DumpTool`] and [`catalog::Catalog`] traits.
//!
//! ```rust,no_run
//! use quarry::adapters::dump::{DumpRequest, DumpTool, MysqlDump};
//! use quarry::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("quarry.toml")?;
//! let tool = MysqlDump::from_config(&config)?;
//! let mut buf: Vec<u8> = Vec::new();
//! let output = tool.dump(&DumpRequest::Structure, &mut buf).await?;
//! println!("{} bytes, status {:?}", buf.len(), output.status);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod dump;
pub mod process;
