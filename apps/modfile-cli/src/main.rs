use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use modfile::{default_compiler, Compiler, Module};
use modfile_bootstrap::{AppConfig, CliArgs, OutputConfig, OutputFormat};

use std::io::Read;
use std::path::{Path, PathBuf};

/// Modfile compiler - turns module descriptors into canonical module IR
#[derive(Parser)]
#[command(name = "modfile")]
#[command(about = "Modfile compiler - turns module descriptors into canonical module IR")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format override (json or yaml)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a modfile and print the module (reads stdin when FILE is omitted)
    Compile { file: Option<PathBuf> },
    /// Compile a modfile and only report whether it is valid
    Check { file: Option<PathBuf> },
    /// List the registered schema versions
    Versions,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        format: cli.format,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // 1) defaults -> 2) YAML (if provided) -> 3) env (MODFILE__*) -> 4) CLI overrides
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    let base_dir = cli
        .config
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    modfile_bootstrap::init_logging(&logging_config, &base_dir);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let compiler = default_compiler()?;

    match cli.command.unwrap_or(Commands::Compile { file: None }) {
        Commands::Compile { file } => {
            let module = compile_source(compiler, file.as_deref())?;
            println!("{}", render(&module, &config.output)?);
        }
        Commands::Check { file } => {
            let module = compile_source(compiler, file.as_deref())?;
            println!(
                "{} is valid ({} services, {} aux services)",
                source_name(file.as_deref()),
                module.services.len(),
                module.aux_services.len()
            );
        }
        Commands::Versions => {
            for version in compiler.registry().versions() {
                println!("{version}");
            }
        }
    }
    Ok(())
}

fn source_name(file: Option<&Path>) -> String {
    file.map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string())
}

fn read_source(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read modfile from stdin")?;
            Ok(buf)
        }
    }
}

fn compile_source(compiler: &Compiler, file: Option<&Path>) -> Result<Module> {
    let raw = read_source(file)?;
    tracing::info!(source = %source_name(file), bytes = raw.len(), "compiling modfile");
    compiler
        .compile(&raw)
        .map_err(|e| anyhow!("{}: {} error: {e}", source_name(file), e.category()))
}

fn render(module: &Module, output: &OutputConfig) -> Result<String> {
    let text = match output.format {
        OutputFormat::Json if output.pretty => serde_json::to_string_pretty(module)?,
        OutputFormat::Json => serde_json::to_string(module)?,
        OutputFormat::Yaml => serde_yaml::to_string(module)?,
    };
    Ok(text)
}
