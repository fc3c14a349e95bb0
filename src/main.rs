//! apilink CLI - API binding registry linker

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use walkdir::WalkDir;

use apilink::{
    CompilationUnit, FixSuggestion, LinkError, Linker, LinkerConfig, PendingBindings, RegistryStore, Scanner,
};

#[derive(Parser)]
#[command(name = "apilink")]
#[command(about = "apilink - build-time API binding registry linker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one compilation pass against the shared registry
    Link {
        /// Unit files, directories or glob patterns
        #[arg(required = true)]
        units: Vec<String>,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Registry file shared by every pass of the build
        #[arg(short, long)]
        registry: Option<PathBuf>,

        /// Implementation version written to the registry header
        #[arg(long, conflicts_with = "version_file")]
        impl_version: Option<String>,

        /// File holding the implementation version
        #[arg(long)]
        version_file: Option<PathBuf>,

        /// Namespace for short-form targets
        #[arg(long)]
        short_form_prefix: Option<String>,

        /// Declarations visible to validation but not scanned (repeatable)
        #[arg(long)]
        classpath: Vec<String>,
    },

    /// Report marker errors without touching a registry
    Check {
        /// Unit files, directories or glob patterns
        #[arg(required = true)]
        units: Vec<String>,

        /// Namespace for short-form targets
        #[arg(long)]
        short_form_prefix: Option<String>,
    },

    /// Print the registry contents
    Show {
        /// Registry file
        #[arg(short, long)]
        registry: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ShowFormat::Text)]
        format: ShowFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShowFormat {
    Text,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Link {
            units,
            config,
            registry,
            impl_version,
            version_file,
            short_form_prefix,
            classpath,
        } => {
            let overrides = LinkerConfig {
                registry,
                impl_version,
                version_file,
                short_form_prefix,
                lock_retry_ms: None,
                classpath,
            };
            link(&units, config.as_deref(), overrides)
        }
        Commands::Check {
            units,
            short_form_prefix,
        } => check(&units, short_form_prefix),
        Commands::Show { registry, format } => show(&registry, format),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            let link_error = e.chain().find_map(|cause| cause.downcast_ref::<LinkError>());
            if let Some(LinkError::UnresolvedBindings { diagnostics, .. }) = link_error {
                print_diagnostics(diagnostics);
            }
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if let Some(suggestion) = link_error.and_then(|le| le.fix_suggestion()) {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

/// Returns `false` when the pass reported positioned errors
fn link(inputs: &[String], config: Option<&Path>, overrides: LinkerConfig) -> anyhow::Result<bool> {
    let base = match config {
        Some(path) => LinkerConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LinkerConfig::default(),
    };
    let config = base.merged(overrides);
    let settings = config.resolve()?;

    let mut linker = Linker::new(settings);
    for path in expand_inputs(&config.classpath)? {
        linker.add_classpath_unit(&load_unit(&path)?);
    }
    let units = expand_inputs(inputs)?;
    for path in &units {
        linker.on_unit_analyzed(&load_unit(path)?);
    }

    let report = linker.on_build_finished()?;
    print_diagnostics(&report.diagnostics);
    if report.has_errors() {
        return Ok(false);
    }

    println!(
        "{} Linked {} unit(s): {} type and {} static binding(s) in registry",
        "✓".green(),
        report.units,
        report.registry_types,
        report.registry_methods
    );
    Ok(true)
}

fn check(inputs: &[String], short_form_prefix: Option<String>) -> anyhow::Result<bool> {
    let scanner = short_form_prefix.map(Scanner::new).unwrap_or_default();
    let mut pending = PendingBindings::new();
    let mut diagnostics = Vec::new();
    let units = expand_inputs(inputs)?;
    for path in &units {
        diagnostics.extend(scanner.scan_unit(&load_unit(path)?, &mut pending));
    }

    print_diagnostics(&diagnostics);
    if !diagnostics.is_empty() {
        return Ok(false);
    }

    let bound = pending.types().filter(|r| r.target.is_some()).count()
        + pending.methods().filter(|r| r.target.is_some()).count();
    println!("{} {} unit(s) OK, {} binding(s) found", "✓".green(), units.len(), bound);
    Ok(true)
}

fn show(path: &Path, format: ShowFormat) -> anyhow::Result<bool> {
    if !path.exists() {
        anyhow::bail!("Registry {} does not exist", path.display());
    }
    let registry = RegistryStore::new(path).lock()?.read()?;

    match format {
        ShowFormat::Json => println!("{}", serde_json::to_string_pretty(&registry.snapshot())?),
        ShowFormat::Text => {
            println!(
                "{} {}",
                "Version:".cyan().bold(),
                registry.version.as_deref().unwrap_or("(none)")
            );
            for (current, entry) in &registry.types {
                println!(
                    "  {} -> {} [{}]{}",
                    current,
                    entry.target,
                    entry.kind,
                    if entry.internal { " internal" } else { "" }
                );
            }
            for (key, entry) in &registry.methods {
                println!(
                    "  {} -> {}{}",
                    key,
                    entry.target,
                    if entry.internal { " internal" } else { "" }
                );
            }
        }
    }
    Ok(true)
}

fn load_unit(path: &Path) -> anyhow::Result<CompilationUnit> {
    CompilationUnit::load(path).with_context(|| format!("Failed to load unit {}", path.display()))
}

/// Files as given, directories walked for `.yaml`/`.yml`, globs expanded
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path) {
                let entry = entry.with_context(|| format!("Failed to walk {input}"))?;
                let is_unit = entry.file_type().is_file()
                    && matches!(entry.path().extension().and_then(|e| e.to_str()), Some("yaml" | "yml"));
                if is_unit {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            paths.extend(found);
        } else if input.contains(['*', '?', '[']) {
            let entries = glob::glob(input).with_context(|| format!("Invalid pattern {input}"))?;
            for entry in entries {
                paths.push(entry.with_context(|| format!("Failed to expand {input}"))?);
            }
        } else {
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}

fn print_diagnostics(diagnostics: &[apilink::Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!(
            "{}: {} {}",
            diagnostic.location,
            "error:".red().bold(),
            diagnostic.message
        );
    }
}
