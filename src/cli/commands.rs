//! 子命令处理

use crate::error::{Error, Result};
use crate::format::{self, OutputMode};
use crate::query::{Arg, QueryExecutor};
use crate::schema::Schema;
use crate::search::SearchOptions;
use crate::types::DRY_RUN_KEY;
use clap::Subcommand;
use std::io::Write;
use tracing::debug;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a query, e.g. `list(status=todo) { id name }`
    Q {
        /// One or more statements separated by `;`
        query: String,

        /// Output format: json, compact or llm
        #[arg(short, long, default_value = "json")]
        format: OutputMode,
    },

    /// Run a single mutation, e.g. `create(title="Ship it")`
    M {
        statement: String,

        /// Output format: json, compact or llm
        #[arg(short, long, default_value = "json")]
        format: OutputMode,

        /// Validate and preview without applying
        #[arg(long)]
        dry_run: bool,

        /// Required for destructive mutations
        #[arg(long)]
        confirm: bool,
    },

    /// Regex search over the data directory
    Grep {
        pattern: String,

        /// Only search files whose name matches this glob
        #[arg(long)]
        file: Option<String>,

        /// Case-insensitive match
        #[arg(short = 'i', long)]
        ignore_case: bool,

        /// Lines of context around each match
        #[arg(short = 'C', long, default_value_t = 0)]
        context: usize,

        /// Output format: json, compact or llm
        #[arg(short, long, default_value = "json")]
        format: OutputMode,
    },
}

/// Execute one subcommand and write its rendered output to `out`.
///
/// Statement-level failures are part of the output. Only parse errors,
/// refused mutations and search errors are returned as `Err`.
pub fn run_command<T, W: Write>(schema: &Schema<T>, command: &Command, out: &mut W) -> Result<()> {
    let rendered = match command {
        Command::Q { query, format } => schema.query_with_mode(query, *format)?,
        Command::M {
            statement,
            format,
            dry_run,
            confirm,
        } => run_mutation(schema, statement, *format, *dry_run, *confirm)?,
        Command::Grep {
            pattern,
            file,
            ignore_case,
            context,
            format,
        } => {
            let mut opts = SearchOptions::new().with_context(*context);
            if let Some(glob) = file {
                opts = opts.with_file_glob(glob.as_str());
            }
            if *ignore_case {
                opts = opts.case_insensitive();
            }
            let results = schema.search(pattern, &opts)?;
            format::format_search(&results, *format)?
        }
    };

    writeln!(out, "{}", rendered)?;
    Ok(())
}

fn run_mutation<T>(
    schema: &Schema<T>,
    input: &str,
    mode: OutputMode,
    dry_run: bool,
    confirm: bool,
) -> Result<String> {
    let mut query = schema.parse(input)?;
    if query.len() != 1 {
        return Err(Error::validation(format!(
            "expected exactly one mutation statement, got {}",
            query.len()
        )));
    }

    let statement = &mut query.statements[0];
    let name = statement.operation.clone();
    if !schema.is_mutation(&name) {
        return Err(Error::validation(format!("{:?} is not a mutation", name))
            .with_detail("operation", name));
    }
    if schema.is_mutation_destructive(&name) && !confirm && !dry_run {
        return Err(Error::forbidden(format!(
            "mutation {:?} is destructive; pass --confirm to apply or --dry-run to preview",
            name
        ))
        .with_detail("operation", name));
    }
    if dry_run {
        statement.args.push(Arg::keyed(DRY_RUN_KEY, "true"));
    }

    debug!(mutation = %name, dry_run, "running mutation from command line");
    let output = QueryExecutor::new(schema).execute(&query);
    format::format_output(&output, mode)
}
