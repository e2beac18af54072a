//! Command-line interface.

mod executor;
mod migrate;
mod parser;

pub use executor::run;
pub use migrate::MigrateCommandHandler;
pub use parser::{Cli, Commands};
