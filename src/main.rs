use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use depgraph::analyzer::DependencyAnalyzer;
use depgraph::config::{get_config_path, load_config, save_config, DepGraphConfig};
use depgraph::export::ExportOutput;
use depgraph::types::{ContextFormat, ExportFormat};

/// Dependency graphs, cycles and LLM context for a codebase.
#[derive(Parser)]
#[command(
    name = "depgraph",
    version,
    about = "Dependency graphs, cycles and LLM context for a codebase"
)]
struct Cli {
    /// Repository path (default: current directory)
    #[arg(short, long, global = true)]
    path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .depgraph/config.json
    Init {
        /// Resolver language (python, terraform)
        #[arg(short, long, default_value = "python")]
        language: String,
    },
    /// Build the dependency graph and print its statistics
    Build {
        /// Rebuild even if nothing changed
        #[arg(short, long)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List circular dependencies
    Cycles,
    /// Export the graph
    Export {
        /// Output format (json, dot, graphml)
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a token-budgeted summary of the graph
    Context {
        /// Token budget
        #[arg(short = 't', long, default_value = "2000")]
        max_tokens: usize,
        /// Output format (markdown or text)
        #[arg(short, long, default_value = "markdown")]
        format: String,
        /// Also write the summary to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List what a node depends on
    Deps {
        /// Node id
        id: String,
        /// Include transitive dependencies
        #[arg(short, long)]
        indirect: bool,
        /// List dependents instead of dependencies
        #[arg(short, long)]
        reverse: bool,
    },
    /// List nodes of one kind
    Kind {
        /// Node kind, e.g. module or resource
        kind: String,
    },
    /// Show build warnings
    Warnings,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> depgraph::errors::Result<()> {
    let project_path = resolve_path(cli.path);
    match cli.command {
        Commands::Init { language } => {
            depgraph::resolution::resolver_for(&language)?;
            let config = DepGraphConfig {
                language,
                ..load_config(&project_path)?
            };
            save_config(&project_path, &config)?;
            println!(
                "Initialized depgraph at {} ({})",
                get_config_path(&project_path).display(),
                config.language
            );
        }
        Commands::Build { force, json } => {
            let analyzer = DependencyAnalyzer::open(&project_path)?;
            let graph = analyzer.build(force)?;
            let stats = graph.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Dependency graph ({})", analyzer.resolver().language_name());
                println!("  Nodes:    {}", stats.node_count);
                println!("  Edges:    {}", stats.edge_count);
                println!("  Warnings: {}", stats.warning_count);
                if !stats.nodes_by_kind.is_empty() {
                    println!("\n  Nodes by kind:");
                    for (kind, count) in &stats.nodes_by_kind {
                        println!("    {}: {}", kind, count);
                    }
                }
            }
        }
        Commands::Cycles => {
            let analyzer = DependencyAnalyzer::open(&project_path)?;
            let cycles = analyzer.find_cycles()?;
            if cycles.is_empty() {
                println!("No circular dependencies found");
            } else {
                for cycle in &cycles {
                    let mut path = cycle.clone();
                    if let Some(first) = cycle.first() {
                        path.push(first.clone());
                    }
                    println!("{}", path.join(" -> "));
                }
            }
        }
        Commands::Export { format, output } => {
            let analyzer = DependencyAnalyzer::open(&project_path)?;
            let format: ExportFormat = format.parse()?;
            match analyzer.export_dependency_graph(format, output.as_deref())? {
                ExportOutput::Content(content) => print!("{}", content),
                ExportOutput::Written(path) => {
                    println!("Exported {} to {}", format.as_str(), path.display())
                }
            }
        }
        Commands::Context {
            max_tokens,
            format,
            output,
        } => {
            let analyzer = DependencyAnalyzer::open(&project_path)?;
            let format: ContextFormat = format.parse()?;
            let context = analyzer.generate_llm_context(max_tokens, format, output.as_deref())?;
            print!("{}", context);
        }
        Commands::Deps {
            id,
            indirect,
            reverse,
        } => {
            let analyzer = DependencyAnalyzer::open(&project_path)?;
            let ids = if reverse {
                analyzer.get_dependents(&id, indirect)?
            } else {
                analyzer.get_dependencies(&id, indirect)?
            };
            if ids.is_empty() {
                println!("No {} for '{}'", if reverse { "dependents" } else { "dependencies" }, id);
            } else {
                for dep in &ids {
                    println!("{}", dep);
                }
            }
        }
        Commands::Kind { kind } => {
            let analyzer = DependencyAnalyzer::open(&project_path)?;
            for id in analyzer.get_by_kind(&kind)? {
                println!("{}", id);
            }
        }
        Commands::Warnings => {
            let analyzer = DependencyAnalyzer::open(&project_path)?;
            let warnings = analyzer.warnings()?;
            if warnings.is_empty() {
                println!("No warnings");
            } else {
                for warning in &warnings {
                    println!("{}", warning);
                }
            }
        }
    }
    Ok(())
}

/// Resolves an optional path argument, defaulting to the current directory.
fn resolve_path(path: Option<String>) -> PathBuf {
    match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
