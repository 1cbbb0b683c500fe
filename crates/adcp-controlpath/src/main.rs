//! CLI entry point for the adcp control-path tool.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use adcp_core::aliases::{self, HIGH_VALUE_TARGETS};
use adcp_core::config::AdcpConfig;
use adcp_core::{Direction, Identity};
use adcp_graph::{Fixture, GraphClient, GraphConfig, NeighborSource, SearchMode};
use adcp_controlpath::convert::{self, OutputFormat};
use adcp_controlpath::export::{export, ExportOptions};
use adcp_controlpath::resolve::resolve_root;
use adcp_controlpath::{
    ControlPathEngine, ControlPathError, ControlPathRequest, ControlPathResult, DenyCache, FileDenySource,
};

#[derive(Parser)]
#[command(name = "adcp")]
#[command(about = "Active Directory control-path analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Alias table language.
    #[arg(long, global = true)]
    lang: Option<String>,

    /// Maximum expansion depth.
    #[arg(long, global = true)]
    maxdepth: Option<usize>,

    /// Neo4j bolt URI.
    #[arg(long, env = "NEO4J_URI", global = true)]
    neo4j: Option<String>,

    /// ACL dump directory holding Relations/*.deny.csv.
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Export options, e.g. "+deny" or "-deny".
    #[arg(short, long, default_value = "+deny", global = true)]
    options: String,

    /// Fail instead of prompting when a search matches several principals.
    #[arg(long, global = true)]
    noprompt: bool,

    /// Config file prefix (default: adcp).
    #[arg(short, long, default_value = "adcp", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Build the control graph of one principal and export it as JSON.
    Graph {
        /// Store key, alias, or name prefix of the root principal.
        search: String,
        /// "to" (who controls the root) or "from" (what the root controls).
        direction: Direction,
        /// Output JSON file.
        outfile: PathBuf,
    },
    /// Search principals whose name contains a string.
    Search { needle: String },
    /// List the aliases of the configured language.
    ListAliases,
    /// Build the control graphs of every well-known high-value principal.
    Full {
        #[arg(default_value = "out")]
        outdir: PathBuf,
    },
    /// Convert an exported graph to another format.
    Convert {
        /// gexf, gml, graphml, or "list" to show the formats.
        #[arg(long, default_value = "list")]
        format: String,
        infile: Option<PathBuf>,
        outdir: Option<PathBuf>,
    },
    /// Manage tagged test fixtures in Neo4j.
    Fixture {
        #[command(subcommand)]
        action: FixtureAction,
    },
}

#[derive(Subcommand)]
enum FixtureAction {
    /// Load fixture nodes and relations from TSV files.
    Load { nodes: PathBuf, relations: PathBuf },
    /// Delete every fixture node.
    Clean,
}

/// Settings resolved from config file, environment, and flags.
struct Session {
    config: AdcpConfig,
    options: ExportOptions,
    noprompt: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let session = load_session(&cli)?;

    match cli.command {
        Command::ListAliases => list_aliases(&session.config.lang)?,
        Command::Convert {
            ref format,
            ref infile,
            ref outdir,
        } => convert_command(format, infile.as_deref(), outdir.as_deref())?,
        Command::Search { ref needle } => {
            let client = connect(&session).await?;
            eprintln!("[+] Results for {needle}");
            for item in client.search(needle, SearchMode::Contains).await? {
                println!("{}\t{}", item.key, item.name);
            }
        }
        Command::Graph {
            ref search,
            direction,
            ref outfile,
        } => {
            let engine = build_engine(&session).await?;
            graph_command(&engine, &session, search, direction, outfile).await?;
        }
        Command::Full { ref outdir } => {
            let engine = build_engine(&session).await?;
            full_command(&engine, &session, outdir).await?;
        }
        Command::Fixture { ref action } => {
            let client = connect(&session).await?;
            match action {
                FixtureAction::Load { nodes, relations } => {
                    let fixture = Fixture::from_tsv(nodes, relations)?;
                    let (nodes, relations) = client.load_fixture(&fixture).await?;
                    eprintln!("[+] Loaded {nodes} nodes and {relations} relations");
                }
                FixtureAction::Clean => {
                    let deleted = client.delete_fixture().await?;
                    eprintln!("[+] Deleted {deleted} fixture nodes");
                }
            }
        }
    }

    Ok(())
}

fn load_session(cli: &Cli) -> anyhow::Result<Session> {
    let mut config = AdcpConfig::load(&cli.config).context("Failed to load configuration")?;

    if let Some(uri) = &cli.neo4j {
        config.neo4j.uri = uri.clone();
    }
    if let Some(depth) = cli.maxdepth {
        config.control_path.max_depth = depth;
    }
    if let Some(secs) = cli.timeout {
        config.control_path.timeout_secs = Some(secs);
    }
    if let Some(workdir) = &cli.workdir {
        config.workdir = Some(workdir.display().to_string());
    }
    if let Some(lang) = &cli.lang {
        config.lang = lang.clone();
    }
    if aliases::table(&config.lang).is_err() {
        tracing::warn!(lang = %config.lang, available = ?aliases::languages(), "Invalid language, using default");
        config.lang = aliases::DEFAULT_LANGUAGE.to_string();
    }

    let (options, invalid) = ExportOptions::parse(&cli.options);
    for option in invalid {
        tracing::warn!(%option, "Invalid option");
    }

    Ok(Session {
        config,
        options,
        noprompt: cli.noprompt,
    })
}

async fn connect(session: &Session) -> anyhow::Result<GraphClient> {
    let graph_config = GraphConfig::from(&session.config.neo4j);
    let client = GraphClient::connect(&graph_config)
        .await
        .with_context(|| format!("Cannot connect to Neo4j at {}", graph_config.uri))?;
    tracing::info!(uri = %graph_config.uri, "Neo4j connected");
    Ok(client)
}

async fn build_engine(session: &Session) -> anyhow::Result<ControlPathEngine> {
    let client = connect(session).await?;
    let settings = &session.config.control_path;

    let denials = match session.config.workdir.as_deref().map(Path::new) {
        Some(workdir) if FileDenySource::is_workdir(workdir) => {
            tracing::info!(workdir = %workdir.display(), "Dump path");
            DenyCache::new(Arc::new(FileDenySource::new(workdir)))
        }
        Some(workdir) => {
            tracing::warn!(workdir = %workdir.display(), "Dump path invalid, deny ACEs will not be processed");
            DenyCache::disabled()
        }
        None => DenyCache::disabled(),
    };

    let mut engine = ControlPathEngine::new(Arc::new(client))
        .with_deny_cache(Arc::new(denials))
        .with_max_depth(settings.max_depth);
    if let Some(secs) = settings.timeout_secs {
        engine = engine.with_timeout(Duration::from_secs(secs));
    }
    Ok(engine)
}

async fn graph_command(
    engine: &ControlPathEngine,
    session: &Session,
    search: &str,
    direction: Direction,
    outfile: &Path,
) -> anyhow::Result<()> {
    let root = match resolve_root(engine.source().as_ref(), search, &session.config.lang).await {
        Ok(root) => root,
        Err(ControlPathError::AmbiguousRoot { candidates, .. }) => {
            if session.noprompt {
                anyhow::bail!("Multiple principals match {search} and prompt is disabled");
            }
            prompt_choice(candidates)?
        }
        Err(e) => return Err(e.into()),
    };

    eprintln!("[+] Building control graph using root {}", root.name);
    let result = engine.control_graph(ControlPathRequest::new(root, direction)).await?;
    eprintln!("[+] Build time: {} ms", result.computation_ms);

    if write_result(&result, &session.options, outfile)? {
        eprintln!("[+] Control graph written to {}", outfile.display());
    } else {
        eprintln!("[!] Empty graph");
    }
    Ok(())
}

async fn full_command(engine: &ControlPathEngine, session: &Session, outdir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(outdir)?;

    let mut requests = Vec::new();
    let mut outfiles = Vec::new();
    for &(alias, direction) in HIGH_VALUE_TARGETS {
        match resolve_root(engine.source().as_ref(), alias, &session.config.lang).await {
            Ok(root) => {
                requests.push(ControlPathRequest::new(root, direction));
                outfiles.push(outdir.join(format!("{alias}_{direction}_short.json")));
            }
            Err(e @ (ControlPathError::RootNotFound { .. } | ControlPathError::AmbiguousRoot { .. })) => {
                tracing::warn!(alias, error = %e, "Skipping alias");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let concurrency = session.config.control_path.batch_concurrency;
    let results = engine.control_graphs(requests, concurrency).await;

    for (result, outfile) in results.into_iter().zip(outfiles) {
        let result = result?;
        if write_result(&result, &session.options, &outfile)? {
            eprintln!("[+] {} written", outfile.display());
        } else {
            eprintln!("[!] Empty graph for {}", result.root.name);
        }
    }
    Ok(())
}

/// Export `result` to `outfile`. Returns `false` when there was no graph.
fn write_result(result: &ControlPathResult, options: &ExportOptions, outfile: &Path) -> anyhow::Result<bool> {
    let Some(graph) = &result.graph else {
        return Ok(false);
    };
    export(graph, options)
        .write_json_file(outfile)
        .with_context(|| format!("Cannot write {}", outfile.display()))?;
    Ok(true)
}

fn prompt_choice(mut candidates: Vec<Identity>) -> anyhow::Result<Identity> {
    eprintln!("[!] Multiple choices:");
    for (i, item) in candidates.iter().enumerate() {
        eprintln!("[{i:4}] {}", item.name);
    }
    eprint!("Choice: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let choice: usize = line.trim().parse().context("Bad value")?;
    if choice >= candidates.len() {
        anyhow::bail!("Bad value {choice}");
    }
    Ok(candidates.swap_remove(choice))
}

fn list_aliases(lang: &str) -> anyhow::Result<()> {
    for (alias, pattern) in aliases::table(lang)? {
        println!("{alias}\t{pattern}");
    }
    Ok(())
}

fn convert_command(format: &str, infile: Option<&Path>, outdir: Option<&Path>) -> anyhow::Result<()> {
    if format == "list" {
        println!("Available formats:");
        for format in OutputFormat::ALL {
            println!("- {format}");
        }
        return Ok(());
    }

    let format: OutputFormat = format.parse()?;
    let (Some(infile), Some(outdir)) = (infile, outdir) else {
        anyhow::bail!("convert needs an input file and an output directory");
    };
    let written = convert::convert_file(infile, outdir, format)?;
    eprintln!("[+] Written {}", written.display());
    Ok(())
}
