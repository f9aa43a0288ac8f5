//! @ai:module:intent CLI entry point for linting, compiling and diffing API documentation
//! @ai:module:layer presentation
//! @ai:module:public_api main
//! @ai:module:depends_on config, extractor, linter, compiler, output

use apidoc_parser::{
    config::DEFAULT_CONFIG_FILE, extractor, linter, output, CompiledGraph, Compiler, Config,
    OutputFormat, VersionNumber,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "apidoc")]
#[command(author, version, about = "Compile @api- docblock annotations into versioned API documentation")]
struct Cli {
    /// Path to the project configuration
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse every controller and representation and report all problems
    Lint {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Compile the documentation for one version, or every supported version
    Compile {
        /// Version to compile (defaults to the configured default version)
        #[arg(long = "api-version")]
        api_version: Option<String>,

        /// Compile every supported version plus the changelog
        #[arg(long, default_value = "false")]
        all: bool,

        /// Include private uris and annotations
        #[arg(long, default_value = "false")]
        private: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "json-pretty")]
        format: Format,
    },

    /// Build the changelog across all supported versions
    Changelog {
        /// Include private uris and annotations
        #[arg(long, default_value = "false")]
        private: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "apidoc_parser=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn compile_graph(config: &Config) -> apidoc_parser::Result<CompiledGraph> {
    let sources = extractor::extract_project(config)?;
    Compiler::from_config(config).compile(&sources.actions, &sources.representations)
}

fn load_config(path: &Path) -> Option<Config> {
    match Config::load(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let Some(config) = load_config(&cli.config) else {
        return ExitCode::from(2);
    };

    match cli.command {
        Commands::Lint { format } => match linter::lint_project(&config) {
            Ok(lint_result) => {
                println!("{}", output::format_lint_result(&lint_result, format.into()));

                if lint_result.passed() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(1)
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(2)
            }
        },

        Commands::Compile {
            api_version,
            all,
            private,
            format,
        } => {
            let mut filter = config.filter();
            filter.include_private |= private;

            let version = match api_version.as_deref().map(str::parse::<VersionNumber>) {
                Some(Ok(version)) => version,
                Some(Err(e)) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::from(2);
                }
                None => config.default_version(),
            };

            let rendered = compile_graph(&config).and_then(|graph| {
                if all {
                    let compilation = graph.compile_all(&filter)?;
                    Ok(output::format_compilation(&compilation, format.into()))
                } else {
                    let view = graph.for_version(version, &filter);
                    Ok(output::format_version_view(&view, format.into()))
                }
            });

            match rendered {
                Ok(text) => {
                    println!("{}", text);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::from(1)
                }
            }
        }

        Commands::Changelog { private, format } => {
            let mut filter = config.filter();
            filter.include_private |= private;

            match compile_graph(&config).and_then(|graph| graph.changelog(&filter)) {
                Ok(changelog) => {
                    println!("{}", output::format_changelog(&changelog, format.into()));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::from(1)
                }
            }
        }
    }
}
