//! 命令行适配层
//!
//! Generic `q`, `m` and `grep` subcommands. A host binary embeds [`Command`]
//! in its own clap parser and hands the parsed value to [`run_command`]
//! together with its schema.

mod commands;

pub use commands::{run_command, Command};
