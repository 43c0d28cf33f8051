use clap::Parser;
use kindred::KindredError;
use kindred::config::RunConfig;
use kindred::orchestrator;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kindred")]
#[command(about = "Fuzzy record clustering over partitioned tabular data", long_about = None)]
struct Cli {
    /// Path to the run configuration JSON
    #[arg(long)]
    config: PathBuf,

    /// Path to the input table (CSV with headers)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Query spec id of previously cleaned data; the input resolves to
    /// clean_data/data_spec=<id>.csv
    #[arg(long)]
    query_spec: Option<i64>,

    /// Directory for the output table and the spec cache
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Worker pool size
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

fn main() -> Result<(), KindredError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = RunConfig::from_file(&cli.config)?;

    let data_path = match (&cli.data, cli.query_spec) {
        (Some(_), Some(_)) => {
            return Err(KindredError::Config(
                "cannot specify both a query spec and a data path".to_string(),
            ));
        }
        (Some(path), None) => path.clone(),
        (None, Some(id)) => {
            config.query_spec = Some(id);
            PathBuf::from(format!("clean_data/data_spec={}.csv", id))
        }
        (None, None) => {
            return Err(KindredError::Config(
                "either a query spec or a data path is required".to_string(),
            ));
        }
    };
    if !data_path.is_file() {
        return Err(KindredError::Config(format!(
            "path to data is not valid: {}",
            data_path.display()
        )));
    }

    let outcome = orchestrator::run(&config, &data_path, &cli.output, cli.workers)?;
    println!(
        "[kindred] Clustered {} rows across {} partitions",
        outcome.rows, outcome.partitions
    );
    println!(
        "[kindred] Complete. Saved results as spec {} to {}",
        outcome.run_id,
        outcome.output_path.display()
    );

    Ok(())
}
