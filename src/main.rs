use anyhow::{bail, Context, Result as AnyhowResult};
use clap::Parser;
use fresh_lines::{EngineConfig, LocalLineSource, RangeCache};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fresh-lines")]
#[command(about = "View and patch windows of huge text files", long_about = None)]
#[command(version)]
struct Args {
    /// File to read
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Path to a JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the configured chunk size
    #[arg(long, value_name = "LINES")]
    chunk_size: Option<usize>,

    /// Override the configured overscan
    #[arg(long, value_name = "LINES")]
    overscan: Option<usize>,

    /// First line to print (0-based)
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Number of lines to print (default: the chunk size)
    #[arg(long, value_name = "LINES")]
    count: Option<usize>,

    /// Load and print the whole file
    #[arg(long, conflicts_with_all = ["start", "count"])]
    all: bool,

    /// Replace a line before printing, as LINE=TEXT (repeatable); edits are
    /// saved back to the file
    #[arg(long = "set", value_name = "LINE=TEXT", value_parser = parse_edit)]
    edits: Vec<(usize, String)>,

    /// Print the patch batch as JSON instead of saving it
    #[arg(long, requires = "edits")]
    dry_run: bool,
}

fn parse_edit(arg: &str) -> Result<(usize, String), String> {
    let (line, text) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected LINE=TEXT, got '{arg}'"))?;
    let line = line
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid line number '{line}': {e}"))?;
    Ok((line, text.to_string()))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> AnyhowResult<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(overscan) = args.overscan {
        config.overscan = overscan;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> AnyhowResult<()> {
    let args = Args::parse();
    init_logging();

    let config = load_config(&args)?;
    let cache = RangeCache::new(Arc::new(LocalLineSource::new()), config);

    cache.open(&args.file).await;
    if let Some(err) = cache.error() {
        bail!("{}: {err}", args.file.display());
    }

    for (line, text) in &args.edits {
        cache.set_line_content(*line, text.as_str());
    }
    if args.dry_run {
        let patches: Vec<fresh_lines::PatchOperation> = cache
            .dirty_ranges()
            .into_iter()
            .map(Into::into)
            .collect();
        println!("{}", serde_json::to_string_pretty(&patches)?);
        return Ok(());
    }
    if cache.has_unsaved_changes() {
        cache
            .save_edits()
            .await
            .with_context(|| format!("saving {}", args.file.display()))?;
    }

    if args.all {
        cache.load_all().await;
        match cache.full_content() {
            Some(content) => println!("{content}"),
            None => bail!(
                "{}: could not load all lines: {}",
                args.file.display(),
                cache
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string())
            ),
        }
        return Ok(());
    }

    let count = args.count.unwrap_or(cache.config().chunk_size);
    let end = args.start.saturating_add(count).min(cache.total_lines());
    cache.load_range(args.start, end).await;
    if let Some(err) = cache.error() {
        bail!("{}: {err}", args.file.display());
    }
    for line in args.start..end {
        println!("{:>7}  {}", line + 1, cache.display_line(line).unwrap_or_default());
    }
    Ok(())
}
