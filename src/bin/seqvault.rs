use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use seqvault::config::ConfigLoader;
use seqvault::domain::{AccessionId, OutputFormat};
use seqvault::error::{FetchError, SeqvaultError};
use seqvault::export::write_resolution;
use seqvault::input::{parse_accession_list, read_accession_file};
use seqvault::ncbi::{EntrezHttpClient, SequenceFetcher};
use seqvault::output::{JsonOutput, OutputMode, TerminalProgress, print_summary};
use seqvault::reconcile::{Reconciler, Resolution};
use seqvault::store::JsonTableStore;

#[derive(Parser)]
#[command(name = "seqvault")]
#[command(about = "Resolve protein accessions through a local sequence store backed by NCBI")]
#[command(version)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true, help = "Path of the JSON sequence table")]
    store: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve accessions, fetching missing sequences from NCBI")]
    Fetch(ResolveArgs),
    #[command(about = "Resolve accessions from the local store only")]
    Lookup(ResolveArgs),
}

#[derive(Args)]
struct ResolveArgs {
    #[arg(help = "Accession numbers (comma or space separated)")]
    accessions: Vec<String>,

    #[arg(long, help = "Text file with one accession per line")]
    input: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SeqvaultError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SeqvaultError) -> u8 {
    match error {
        SeqvaultError::InvalidAccession(_)
        | SeqvaultError::EmptyRequest
        | SeqvaultError::InputRead(_)
        | SeqvaultError::ConfigRead(_)
        | SeqvaultError::ConfigParse(_)
        | SeqvaultError::UnsupportedConfigVersion(_)
        | SeqvaultError::MissingContactEmail => 2,
        SeqvaultError::Store(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let store_path = cli
        .store
        .map(Utf8PathBuf::from)
        .unwrap_or(config.store_path);
    let store = JsonTableStore::new(store_path);

    match cli.command {
        Commands::Fetch(args) => {
            let accessions = collect_accessions(&args)?;
            let fetcher = EntrezHttpClient::new(&config.ncbi)?;
            let reconciler = Reconciler::new(store, fetcher);
            let resolution = match output_mode {
                OutputMode::NonInteractive => reconciler.resolve(accessions, &JsonOutput),
                OutputMode::Interactive => reconciler.resolve(accessions, &TerminalProgress),
            }
            .map_err(SeqvaultError::from)?;
            Ok(emit(&resolution, &args, output_mode)?)
        }
        Commands::Lookup(args) => {
            let accessions = collect_accessions(&args)?;
            let reconciler = Reconciler::new(store, NopFetcher);
            let resolution = reconciler
                .lookup_only(accessions)
                .map_err(SeqvaultError::from)?;
            Ok(emit(&resolution, &args, output_mode)?)
        }
    }
}

fn collect_accessions(args: &ResolveArgs) -> Result<Vec<AccessionId>, SeqvaultError> {
    let mut accessions = Vec::new();
    for value in &args.accessions {
        accessions.extend(parse_accession_list(value)?);
    }
    if let Some(path) = &args.input {
        accessions.extend(read_accession_file(path)?);
    }
    if accessions.is_empty() {
        return Err(SeqvaultError::EmptyRequest);
    }
    Ok(accessions)
}

fn emit(
    resolution: &Resolution,
    args: &ResolveArgs,
    output_mode: OutputMode,
) -> Result<(), SeqvaultError> {
    match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|err| {
                SeqvaultError::Export(format!("create {}: {err}", path.display()))
            })?;
            write_resolution(BufWriter::new(file), resolution, args.format)?;
        }
        None => write_resolution(io::stdout().lock(), resolution, args.format)?,
    }
    if matches!(output_mode, OutputMode::Interactive) {
        print_summary(resolution);
    }
    Ok(())
}

struct NopFetcher;

impl SequenceFetcher for NopFetcher {
    fn fetch(&self, _id: &AccessionId) -> Result<String, FetchError> {
        Err(FetchError::Transient(
            "remote fetching is disabled for lookup".to_string(),
        ))
    }
}
