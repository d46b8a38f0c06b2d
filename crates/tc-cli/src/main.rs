//! Tracker Counter CLI
//!
//! Compiles block lists into static rulesets, runs the refresh cycle against
//! a local state file, and runs the detectors over URLs or saved pages.

mod file_store;
mod output;
mod remote;

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};

use tc_compiler::{compile_list, ListConfig, ListRefresher, RefreshOutcome};
use tc_core::detect::{has_tracking_domain, has_tracking_params, is_tracking_url, NoSurfaces};
use tc_core::scanner::scan_page;
use tc_core::store::{KeyValueStore, LAST_FETCH_KEY};
use tc_core::PageSnapshot;

use file_store::JsonFileStore;
use output::{read_config, read_text, write_batches};
use remote::{HttpSource, RulesetDir};

#[derive(Parser)]
#[command(name = "tc-cli")]
#[command(about = "Tracker Counter block-list compiler and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a block list into rules_<n>.json rulesets
    Compile {
        /// Input block list file
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for the ruleset files
        #[arg(short, long, default_value = "rulesets")]
        output: PathBuf,

        /// JSON list configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured rules per file
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Fetch the configured list unless the cached copy is fresh
    Refresh {
        /// State file holding the fetch cache
        #[arg(short, long, default_value = "tc-state.json")]
        state: PathBuf,

        /// Directory for the ruleset files
        #[arg(short, long, default_value = "rulesets")]
        output: PathBuf,

        /// JSON list configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Ignore the freshness window
        #[arg(short, long)]
        force: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Classify URLs with the tracking-URL detector
    Check {
        /// URLs to classify
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Count trackers in a saved page snapshot (JSON)
    Scan {
        /// Snapshot file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Compile { verbose, .. } | Commands::Refresh { verbose, .. } => *verbose,
        _ => false,
    };
    init_logging(verbose);

    let result = match cli.command {
        Commands::Compile {
            input,
            output,
            config,
            chunk_size,
            ..
        } => cmd_compile(&input, &output, config.as_deref(), chunk_size),
        Commands::Refresh {
            state,
            output,
            config,
            force,
            ..
        } => cmd_refresh(&state, &output, config.as_deref(), force),
        Commands::Check { urls } => cmd_check(&urls),
        Commands::Scan { input } => cmd_scan(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: Option<&Path>, chunk_size: Option<usize>) -> Result<ListConfig, String> {
    let mut config = read_config(path)?;
    if let Some(chunk_size) = chunk_size {
        config.chunk_size = chunk_size;
        config.validate().map_err(|e| format!("Invalid config: {}", e))?;
    }
    Ok(config)
}

fn cmd_compile(input: &Path, output: &Path, config: Option<&Path>, chunk_size: Option<usize>) -> Result<(), String> {
    let config = load_config(config, chunk_size)?;
    let start = Instant::now();

    let text = read_text(input)?;
    let compiled = compile_list(&text, &config);
    if compiled.patterns.is_empty() {
        return Err(format!("No usable patterns in '{}'", input.display()));
    }
    let paths = write_batches(output, &compiled.batches)?;

    println!("Compiled '{}' to {} ruleset files in '{}'", input.display(), paths.len(), output.display());
    println!("  Lines:    {}", text.lines().count());
    println!(
        "  Rules:    {} -> {} ({} domains wildcarded)",
        compiled.raw, compiled.stats.after, compiled.stats.wildcarded
    );
    println!("  Time:     {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

    Ok(())
}

fn cmd_refresh(state: &Path, output: &Path, config: Option<&Path>, force: bool) -> Result<(), String> {
    let config = load_config(config, None)?;
    let store = JsonFileStore::open(state).map_err(|e| e.to_string())?;
    if force {
        store
            .set(LAST_FETCH_KEY, serde_json::Value::Null)
            .map_err(|e| e.to_string())?;
    }

    let engine = RulesetDir::new(output, config.chunk_size);
    let refresher = ListRefresher::new(HttpSource::default(), engine, &store, config);

    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    let outcome = runtime.block_on(refresher.refresh(now_ms()));

    match &outcome {
        RefreshOutcome::Installed { rules, batches } => {
            let pruned = refresher.engine().prune(*batches)?;
            println!("Installed {} rules in {} files under '{}'", rules.len(), batches, output.display());
            if pruned > 0 {
                println!("  Removed {} outdated ruleset files", pruned);
            }
        }
        RefreshOutcome::Cached { rules } => {
            println!("Cache in '{}' is fresh ({} rules), nothing fetched", store.path().display(), rules.len());
        }
        RefreshOutcome::FellBack { rules } => {
            println!("Refresh failed, keeping {} cached rules", rules.len());
        }
        RefreshOutcome::Failed => return Err("Refresh failed and no cached rules exist".to_string()),
    }

    Ok(())
}

fn cmd_check(urls: &[String]) -> Result<(), String> {
    for url in urls {
        let verdict = if is_tracking_url(url) { "TRACKING" } else { "clean" };
        println!("{:<8} {}", verdict, url);
        println!("         params: {}  domain: {}", has_tracking_params(url), has_tracking_domain(url));
    }
    Ok(())
}

fn cmd_scan(input: &Path) -> Result<(), String> {
    let page: PageSnapshot = serde_json::from_str(&read_text(input)?)
        .map_err(|e| format!("Invalid snapshot '{}': {}", input.display(), e))?;
    let counts = scan_page(&page, &NoSurfaces);

    println!("Page: {}", page.url);
    for (category, count) in counts.iter() {
        println!("  {:<12} {}", category.as_str(), count);
    }
    println!("  {:<12} {}", "total", counts.total());
    Ok(())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
