//! Incident theme clustering CLI entry point

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use incident_themes::{Config, LabelingProvider};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

/// Group incident tickets into labeled themes
#[derive(Parser, Debug)]
#[command(name = "themes")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable JSON logging format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cluster documents and label each cluster
    Cluster {
        /// Ticket feed (JSON) or text file with one document per line
        input: PathBuf,
        /// Number of clusters
        #[arg(short = 'k', long)]
        num_clusters: Option<usize>,
        /// Seed for centroid initialization
        #[arg(long)]
        seed: Option<u64>,
        /// Labeling provider
        #[arg(short, long, value_enum)]
        labeler: Option<LabelerArg>,
    },
    /// Partition documents without labeling
    Partition {
        /// Ticket feed (JSON) or text file with one document per line
        input: PathBuf,
        /// Number of clusters
        #[arg(short = 'k', long)]
        num_clusters: Option<usize>,
        /// Seed for centroid initialization
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show the TF-IDF vocabulary fitted on the input
    Vocabulary {
        /// Ticket feed (JSON) or text file with one document per line
        input: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LabelerArg {
    Openai,
    Keywords,
}

impl From<LabelerArg> for LabelingProvider {
    fn from(arg: LabelerArg) -> Self {
        match arg {
            LabelerArg::Openai => LabelingProvider::OpenAi,
            LabelerArg::Keywords => LabelingProvider::Keywords,
        }
    }
}

fn init_logging(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config = if let Some(path) = &args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    match args.command {
        Command::Cluster {
            input,
            num_clusters,
            seed,
            labeler,
        } => {
            let options = cli::ClusterOptions {
                num_clusters,
                seed,
                labeler: labeler.map(Into::into),
            };
            cli::run_cluster(config, input, options, args.json).await
        }
        Command::Partition {
            input,
            num_clusters,
            seed,
        } => {
            let options = cli::ClusterOptions {
                num_clusters,
                seed,
                labeler: None,
            };
            cli::run_partition(config, input, options, args.json).await
        }
        Command::Vocabulary { input } => cli::run_vocabulary(input, args.json).await,
    }
}
