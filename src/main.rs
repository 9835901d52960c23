//! racegraph - linked-data endpoint for race events
//!
//! Command-line interface: serve the SPARQL endpoint, dump the mapped
//! triples or run a single query.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use racegraph::format::reader::{read_ntriples, read_turtle};
use racegraph::pipeline::formats_by_name;
use racegraph::{
    logging, run_server, AppState, InMemorySource, LogLevel, Pipeline, RaceGraphConfig, RdfFormat, ResultsFormat,
    Triple,
};

#[derive(Parser)]
#[command(name = "racegraph")]
#[command(author = "Racegraph Authors")]
#[command(version = "0.1.0")]
#[command(about = "Linked-data view and SPARQL endpoint for race events, athletes and results", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the standard search paths)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON snapshot of events, athletes and results
    #[arg(long, global = true, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Base IRI for minted entity IRIs
    #[arg(long, global = true, value_name = "IRI")]
    base: Option<String>,

    /// Turtle or N-Triples files added to every store
    #[arg(long = "triples", global = true, value_name = "FILE")]
    triples: Vec<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP endpoint
    Serve {
        /// Listen address
        #[arg(long)]
        host: Option<String>,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Serialize every mapped triple
    Dump {
        /// Output format (turtle, rdfxml, jsonld, ntriples)
        #[arg(short, long, default_value = "turtle")]
        format: RdfFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run one query against the mapped triples
    Query {
        /// Query text, @FILE to read it from a file, or - for stdin
        #[arg(value_name = "QUERY")]
        query: String,

        /// Results or RDF format (json, xml, csv, tsv, turtle, ntriples, ...)
        #[arg(short, long)]
        format: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a commented default configuration file
    InitConfig {
        /// Destination
        #[arg(default_value = "racegraph.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::InitConfig { path, force } = &cli.command {
        return init_config(path, *force);
    }

    let mut config = load_config(&cli)?;
    if let Command::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    logging::init(config.general.log_level);
    debug!(?config, "configuration loaded");

    let source = load_source(&config)?;
    let extra = load_triples(&cli.triples)?;

    match cli.command {
        Command::Serve { .. } => {
            let state = AppState::new(Arc::new(source), config).with_triples(extra);
            run_server(state).await.context("Server failed")?;
        }
        Command::Dump { format, output } => {
            let pipeline = Pipeline::new(&source, &config).with_triples(extra);
            let rendered = pipeline.dump(format).context("Failed to serialize triples")?;
            write_output(output.as_deref(), &rendered.body)?;
        }
        Command::Query { query, format, output } => {
            let text = read_query(&query)?;
            let (results_format, rdf_format) = match format.as_deref() {
                Some(name) => formats_by_name(name)?,
                None => (ResultsFormat::default(), RdfFormat::default()),
            };
            let pipeline = Pipeline::new(&source, &config).with_triples(extra);
            let rendered = pipeline.run(&text, results_format, rdf_format)?;
            write_output(output.as_deref(), &rendered.body)?;
        }
        // Handled before the configuration is loaded
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

/// Config file (explicit or searched), environment, then command-line flags
fn load_config(cli: &Cli) -> Result<RaceGraphConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = RaceGraphConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => RaceGraphConfig::load().context("Failed to load configuration")?,
    };

    if let Some(data) = &cli.data {
        config.data.path = Some(data.clone());
    }
    if let Some(base) = &cli.base {
        config.general.base_iri = base.clone();
    }
    if cli.verbose {
        config.general.log_level = LogLevel::Verbose;
    }
    if cli.quiet {
        config.general.log_level = LogLevel::Quiet;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_source(config: &RaceGraphConfig) -> Result<InMemorySource> {
    match &config.data.path {
        Some(path) => {
            let source = InMemorySource::load(path)
                .with_context(|| format!("Failed to load data file: {}", path.display()))?;
            info!(path = %path.display(), "loaded data source");
            Ok(source)
        }
        None => {
            warn!("no data file configured; serving an empty source");
            Ok(InMemorySource::new())
        }
    }
}

fn load_triples(paths: &[PathBuf]) -> Result<Vec<Triple>> {
    let mut triples = Vec::new();
    for path in paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read triples file: {}", path.display()))?;
        let parsed = if path.extension().is_some_and(|ext| ext == "nt") {
            read_ntriples(&content)
        } else {
            read_turtle(&content)
        }
        .with_context(|| format!("Failed to parse {}", path.display()))?;
        debug!(path = %path.display(), triples = parsed.len(), "loaded static triples");
        triples.extend(parsed);
    }
    Ok(triples)
}

fn read_query(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).context("Failed to read query from stdin")?;
        return Ok(text);
    }
    if let Some(path) = arg.strip_prefix('@') {
        return fs::read_to_string(path).with_context(|| format!("Failed to read query file: {}", path));
    }
    Ok(arg.to_string())
}

fn write_output(path: Option<&Path>, body: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, body).with_context(|| format!("Failed to write output file: {}", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(body.as_bytes()).context("Failed to write to stdout")?;
            if !body.ends_with('\n') {
                writeln!(stdout).context("Failed to write to stdout")?;
            }
        }
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(path, RaceGraphConfig::default_config_content())
        .with_context(|| format!("Failed to write config: {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}
