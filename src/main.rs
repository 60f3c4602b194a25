//! CLI entry point for the thesis corpus post-processor.
//!
//! Provides commands for running the analysis pipeline over a directory of
//! document vectors, inspecting settings and checking the LLM endpoint.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use corpusmap::display::{THEME, create_cluster_table, create_summary_table, with_spinner};
use corpusmap::io::ExitCode;
use corpusmap::report::analysis_to_json;
use corpusmap::{
    AnalysisError, AnalysisOptions, ErrorContext, OllamaClient, PostProcessor, RunResult,
    Settings,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, debug, warn};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Thesis corpus analysis
#[derive(Parser)]
#[command(
    name = "corpusmap",
    version = env!("CARGO_PKG_VERSION"),
    about = "Cluster, link and visualise a corpus of thesis embeddings",
    long_about = "Reads *_vector.json records, clusters the embeddings, builds a similarity network and a 2-D projection, then writes a JSON report and an HTML page.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable DEBUG-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .corpusmap directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings as TOML")]
    Config,

    /// Run the full analysis pipeline
    #[command(about = "Analyse a directory of document vectors")]
    Analyze(AnalyzeArgs),

    /// Check the LLM endpoint
    #[command(name = "llm-check", about = "Test that the LLM endpoint is reachable")]
    LlmCheck,
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Directory containing *_vector.json files
    input_dir: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// Where to write the HTML page
    #[arg(long)]
    output_html: Option<PathBuf>,

    /// Directory for word-cloud images
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Number of clusters (k-means only)
    #[arg(long)]
    clusters: Option<usize>,

    /// Clustering method: kmeans or dbscan
    #[arg(long)]
    method: Option<String>,

    /// Similarity metric: cosine, euclidean or correlation
    #[arg(long)]
    metric: Option<String>,

    /// Minimum similarity for a network edge
    #[arg(long)]
    threshold: Option<f64>,

    /// Skip LLM cluster descriptions
    #[arg(long)]
    no_llm: bool,

    /// Print the serialized result to stdout instead of tables
    #[arg(long)]
    json: bool,
}

impl AnalyzeArgs {
    fn apply(&self, settings: &mut Settings) {
        let analysis = &mut settings.analysis;
        if let Some(dir) = &self.input_dir {
            analysis.input_dir = dir.clone();
        }
        if let Some(path) = &self.output_json {
            analysis.output_json = path.clone();
        }
        if let Some(path) = &self.output_html {
            analysis.output_html = path.clone();
        }
        if let Some(dir) = &self.output_dir {
            analysis.output_dir = dir.clone();
        }
        if let Some(k) = self.clusters {
            analysis.n_clusters = Some(k);
        }
        if let Some(method) = &self.method {
            analysis.clustering_method = method.clone();
        }
        if let Some(metric) = &self.metric {
            analysis.similarity_metric = metric.clone();
        }
        if let Some(threshold) = self.threshold {
            analysis.network_threshold = threshold;
        }
        if self.no_llm {
            settings.llm.enabled = false;
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => return report_error(&e).into(),
    };

    let level = if cli.verbose || settings.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Init { force } => run_init(force),
        Commands::Config => run_config(&settings),
        Commands::Analyze(args) => run_analyze(settings, &args),
        Commands::LlmCheck => run_llm_check(&settings),
    };

    match outcome {
        Ok(code) => code.into(),
        Err(e) => report_error(&e).into(),
    }
}

fn load_settings(cli: &Cli) -> RunResult<Settings> {
    if let Some(path) = &cli.config {
        return Settings::load_from(path).map_err(|e| AnalysisError::ConfigError {
            reason: format!("{}: {e}", path.display()),
        });
    }
    match Settings::load() {
        Ok(settings) => Ok(settings),
        Err(e) => {
            eprintln!(
                "{}",
                THEME.warning_with_icon(&format!("Configuration error: {e}"))
            );
            eprintln!("Using default configuration.");
            Ok(Settings::default())
        }
    }
}

fn report_error(error: &AnalysisError) -> ExitCode {
    eprintln!("{}", THEME.error_with_icon(&format!("Error: {error}")));
    for suggestion in error.recovery_suggestions() {
        eprintln!("  Suggestion: {suggestion}");
    }
    ExitCode::from_error(error)
}

fn run_init(force: bool) -> RunResult<ExitCode> {
    let path =
        Settings::init_config_file(force).map_err(|e| AnalysisError::ConfigError {
            reason: e.to_string(),
        })?;
    println!(
        "{} {}",
        THEME.success_with_icon("Created configuration file at:"),
        THEME.path(&path)
    );
    println!("Edit this file to customize your settings.");
    Ok(ExitCode::Success)
}

fn run_config(settings: &Settings) -> RunResult<ExitCode> {
    let rendered = toml::to_string_pretty(settings).context("Rendering settings")?;
    println!("{}", THEME.apply(&THEME.header, "Current Configuration:"));
    println!("{}", "=".repeat(50));
    println!("{rendered}");
    Ok(ExitCode::Success)
}

fn llm_client(settings: &Settings, timeout: Duration) -> Option<OllamaClient> {
    match OllamaClient::new(&settings.llm.endpoint, &settings.llm.model, timeout) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Could not create LLM client: {e}");
            None
        }
    }
}

fn run_analyze(mut settings: Settings, args: &AnalyzeArgs) -> RunResult<ExitCode> {
    args.apply(&mut settings);
    let options = AnalysisOptions::from_settings(&settings)?;

    let client = if settings.llm.enabled {
        llm_client(&settings, Duration::from_secs(settings.llm.timeout_secs))
    } else {
        debug!("LLM narration disabled");
        None
    };

    let mut processor = PostProcessor::new(options);
    if let Some(client) = &client {
        processor = processor.with_generator(client);
    }
    let run = processor.run_full_analysis()?;

    if args.json {
        let json = analysis_to_json(run.result.as_ref());
        let rendered = serde_json::to_string_pretty(&json).context("Rendering result")?;
        println!("{rendered}");
    } else if run.result.is_none() {
        eprintln!(
            "{} {}",
            THEME.warning_with_icon("No documents with embeddings in"),
            THEME.path(&processor.options().input_dir)
        );
    } else {
        println!("{}", create_summary_table(&run, processor.options()));
        println!("{}", create_cluster_table(&run));
    }

    Ok(ExitCode::from_run(&run))
}

fn run_llm_check(settings: &Settings) -> RunResult<ExitCode> {
    let timeout = Duration::from_secs(settings.llm.connect_timeout_secs);
    let Some(client) = llm_client(settings, timeout) else {
        return Ok(ExitCode::GeneralError);
    };

    let reachable = with_spinner(
        &format!("Contacting {}", client.base_url()),
        || client.test_connection(timeout),
    );

    if reachable {
        println!(
            "{}",
            THEME.success_with_icon(&format!("LLM endpoint {} is reachable", client.base_url()))
        );
        println!("  {}", THEME.labeled("model", client.model()));
        Ok(ExitCode::Success)
    } else {
        eprintln!(
            "{}",
            THEME.error_with_icon(&format!("LLM endpoint {} is not reachable", client.base_url()))
        );
        eprintln!("  Suggestion: start the server with 'ollama serve' or set llm.endpoint");
        Ok(ExitCode::GeneralError)
    }
}
