//! Command dispatch: bridges CLI args -> catalog operations -> output formatting.

pub mod config_cmd;
pub mod filters;
pub mod info;
pub mod list;
pub mod show;
pub mod watch;

use s3view_core::Catalog;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, catalog: &Catalog, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::List(args) => list::handle(catalog, args, global).await,
        Command::Show(args) => show::handle(catalog, args, global).await,
        Command::Filters => filters::handle(catalog, global).await,
        Command::Info => info::handle(catalog, global).await,
        Command::Watch(args) => watch::handle(catalog, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
