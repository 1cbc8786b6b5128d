//! Junction CLI - compile metric queries and check permissions
//!
//! Usage:
//!   junction node <name> [-d <dimension>]... [-f <filter>]... [--database <id>]
//!   junction sql <query> [--database <id>]
//!   junction verify <query> -p <permission>... --database <name> [--schema <schema>]
//!   junction dimensions <name>
//!
//! Examples:
//!   junction node num_comments -d users.country -f "users.age>=18"
//!   junction sql "SELECT num_comments, users.country FROM metrics"
//!   junction verify "SELECT * FROM sales" -p "SELECT * FROM postgres" --database postgres
//!
//! Configuration errors exit with 2 for every subcommand.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use junction::auth::{verify_query, QualifierContext};
use junction::config::Settings;
use junction::dag::get_dimensions;
use junction::model::NodeGraph;
use junction::planner::{get_query_for_node, get_query_for_sql, QueryCreate};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "junction")]
#[command(about = "Junction - a metrics semantic layer that compiles to dialect SQL")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $JUNCTION_CONFIG, ./junction.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "sql")]
    format: OutputFormat,

    /// Also report the chosen database on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a node grouped by dimensions and filtered
    Node {
        /// Node name
        name: String,

        /// Group-by dimension, as <node>.<column>
        #[arg(short = 'd', long = "dimension")]
        dimensions: Vec<String>,

        /// Filter, as <node>.<column><op><value>
        #[arg(short = 'f', long = "filter")]
        filters: Vec<String>,

        /// Database id to compile for
        #[arg(long)]
        database: Option<i64>,
    },

    /// Rewrite SQL over the `metrics` table into SQL over physical tables
    Sql {
        query: String,

        /// Database id to compile for
        #[arg(long)]
        database: Option<i64>,
    },

    /// Check a query against permissions (exit 0 allowed, 1 denied, 2 error)
    Verify {
        query: String,

        /// Permission SQL; repeat for several
        #[arg(short, long = "permission", required = true)]
        permissions: Vec<String>,

        /// Database name used to qualify tables
        #[arg(long)]
        database: String,

        #[arg(long)]
        catalog: Option<String>,

        #[arg(long)]
        schema: Option<String>,
    },

    /// List the dimensions a node can be grouped or filtered by
    Dimensions { name: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// SQL text only
    Sql,
    /// JSON envelope with the database id
    Json,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_ref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    let output = Output {
        format: cli.format,
        verbose: cli.verbose,
    };
    match cli.command {
        Commands::Node {
            name,
            dimensions,
            filters,
            database,
        } => with_graph(&settings, |graph| {
            cmd_node(graph, &name, &dimensions, &filters, database, output)
        }),
        Commands::Sql { query, database } => with_graph(&settings, |graph| {
            print_query(get_query_for_sql(graph, &query, database), output)
        }),
        Commands::Verify {
            query,
            permissions,
            database,
            catalog,
            schema,
        } => {
            let mut context = QualifierContext::new(database);
            context.catalog = catalog;
            context.schema = schema;
            cmd_verify(&settings, &query, &permissions, &context)
        }
        Commands::Dimensions { name } => with_graph(&settings, |graph| cmd_dimensions(graph, &name)),
    }
}

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    verbose: bool,
}

fn with_graph(settings: &Settings, run: impl FnOnce(&NodeGraph) -> ExitCode) -> ExitCode {
    match settings.build_graph() {
        Ok(graph) => run(&graph),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, junction::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn cmd_node(
    graph: &NodeGraph,
    name: &str,
    dimensions: &[String],
    filters: &[String],
    database: Option<i64>,
    output: Output,
) -> ExitCode {
    let result = graph
        .node(name)
        .and_then(|node| get_query_for_node(graph, node, dimensions, filters, database));
    print_query(result, output)
}

fn print_query(result: junction::Result<QueryCreate>, output: Output) -> ExitCode {
    let created = match result {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if output.verbose {
        eprintln!("-- database: {}", created.database_id);
    }
    match output.format {
        OutputFormat::Sql => println!("{}", created.submitted_query),
        OutputFormat::Json => match serde_json::to_string_pretty(&created) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn cmd_verify(
    settings: &Settings,
    query: &str,
    permissions: &[String],
    context: &QualifierContext,
) -> ExitCode {
    let inspector = match settings.verifier_inspector() {
        Ok(inspector) => inspector,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };
    match verify_query(
        query,
        permissions,
        inspector.as_ref(),
        context,
        &settings.verifier.wildcard,
    ) {
        Ok(true) => {
            println!("allowed");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("denied");
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Verification error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn cmd_dimensions(graph: &NodeGraph, name: &str) -> ExitCode {
    let result = graph.node(name).and_then(|node| get_dimensions(graph, node));
    match result {
        Ok(dimensions) => {
            for dimension in dimensions {
                println!("{}", dimension);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
