mod config;
mod seed;
mod server;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use quest_core::Date;
use quest_store::Store;
use quest_store::store::Table;

use config::AppConfig;
use seed::SeedOptions;

#[derive(Parser)]
#[command(name = "quest", about = "Daily quest recommendations: CLI and HTTP server")]
struct Cli {
    /// Database path (overrides QUEST_DB and the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML config file (overrides QUEST_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Listen address, e.g. 127.0.0.1:8000
        #[arg(long)]
        bind: Option<String>,
    },

    /// Recommend today's quests for a user
    Recommend {
        user_id: String,

        /// Print scores, path, and gate report as JSON
        #[arg(long)]
        detailed: bool,

        /// Recommend as of this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        date: Option<Date>,
    },

    /// Show a user's profile, survey summary, and category scores
    Preferences { user_id: String },

    /// Show the data-sufficiency gate report
    Gate,

    /// Import users, answers, quests, and log rows from a JSON file
    Import { path: PathBuf },

    /// Export the whole database to a JSON file
    Export { path: PathBuf },

    /// Fill the database with synthetic users, quests, and interactions
    Seed {
        #[arg(long, default_value_t = 200)]
        users: usize,

        #[arg(long, default_value_t = 40)]
        quests: usize,

        /// Days of recommendation history to generate
        #[arg(long, default_value_t = 30)]
        days: i64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn open_store(config: &AppConfig, cli: &Cli) -> Result<Store> {
    let path = config.db_path(cli.db.as_deref());
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Store::open(&path).with_context(|| format!("failed to open database {}", path.display()))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Serve { bind } => cmd_serve(&cli, &config, bind.as_deref()).await,
        Commands::Recommend {
            user_id,
            detailed,
            date,
        } => cmd_recommend(&cli, &config, user_id, *detailed, *date),
        Commands::Preferences { user_id } => cmd_preferences(&cli, &config, user_id),
        Commands::Gate => cmd_gate(&cli, &config),
        Commands::Import { path } => cmd_import(&cli, &config, path),
        Commands::Export { path } => cmd_export(&cli, &config, path),
        Commands::Seed {
            users,
            quests,
            days,
            seed,
        } => {
            let options = SeedOptions {
                users: *users,
                quests: *quests,
                days: *days,
                seed: *seed,
                ..SeedOptions::default()
            };
            cmd_seed(&cli, &config, &options)
        }
    }
}

async fn cmd_serve(cli: &Cli, config: &AppConfig, bind: Option<&str>) -> Result<()> {
    let store = open_store(config, cli)?;
    let bind = bind.unwrap_or(&config.server.bind);
    tracing::info!("starting recommendation server on {bind}");

    let state = server::AppState::new(store, config.recommender());
    server::run(state, bind)
        .await
        .with_context(|| format!("server on {bind} failed"))
}

fn cmd_recommend(
    cli: &Cli,
    config: &AppConfig,
    user_id: &str,
    detailed: bool,
    date: Option<Date>,
) -> Result<()> {
    let store = open_store(config, cli)?;
    let today = date.unwrap_or_else(Date::today);
    let rec = config
        .recommender()
        .recommend_detailed(&store, user_id, today)
        .with_context(|| format!("failed to recommend for {user_id}"))?;

    if detailed {
        println!("{}", serde_json::to_string_pretty(&rec)?);
    } else if rec.quests.is_empty() {
        println!("(no recommendations)");
    } else {
        for id in rec.quest_ids() {
            println!("{id}");
        }
    }

    if cli.verbose {
        eprintln!(
            "--- path={}, recorded={}, date={today} ---",
            rec.path, rec.recorded
        );
    }
    Ok(())
}

fn cmd_preferences(cli: &Cli, config: &AppConfig, user_id: &str) -> Result<()> {
    let store = open_store(config, cli)?;
    let report = config
        .recommender()
        .user_preferences(&store, user_id, Date::today())
        .with_context(|| format!("failed to analyse preferences for {user_id}"))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_gate(cli: &Cli, config: &AppConfig) -> Result<()> {
    let store = open_store(config, cli)?;
    let recommender = config.recommender();
    let report = recommender
        .data_sufficiency(&store)
        .context("failed to evaluate data sufficiency")?;
    let gate = &recommender.config().gate;

    println!("sufficient:    {}", report.is_sufficient);
    println!("requirements:  {}", report.requirements_label());
    println!(
        "interactions:  {}/{} ({:.1}%)",
        report.total_interactions, gate.min_total_interactions, report.progress.interactions_pct
    );
    println!(
        "users:         {}/{} ({:.1}%)",
        report.active_users, gate.min_active_users, report.progress.users_pct
    );
    println!(
        "quests:        {}/{} ({:.1}%)",
        report.active_quests, gate.min_active_quests, report.progress.quests_pct
    );
    println!(
        "avg/user:      {:.2}/{:.2} ({:.1}%)",
        report.avg_interactions_per_user,
        gate.min_avg_interactions_per_user,
        report.progress.avg_interactions_pct
    );
    Ok(())
}

fn cmd_import(cli: &Cli, config: &AppConfig, path: &Path) -> Result<()> {
    let store = open_store(config, cli)?;
    let summary = store
        .import_json_file(path)
        .context("failed to import JSON")?;
    println!(
        "imported from {}. users={}, answers={}, quests={}, log={} (skipped {})",
        path.display(),
        summary.users,
        summary.survey_answers,
        summary.quests,
        summary.recommendations,
        summary.skipped_recommendations
    );
    Ok(())
}

fn cmd_export(cli: &Cli, config: &AppConfig, path: &Path) -> Result<()> {
    let store = open_store(config, cli)?;
    store
        .export_json_file(path)
        .with_context(|| format!("failed to export to {}", path.display()))?;
    println!(
        "exported to {}. users={}, quests={}, log={}",
        path.display(),
        store.table_count(Table::Users)?,
        store.table_count(Table::Quests)?,
        store.table_count(Table::Recommendations)?
    );
    Ok(())
}

fn cmd_seed(cli: &Cli, config: &AppConfig, options: &SeedOptions) -> Result<()> {
    let store = open_store(config, cli)?;
    let recommender = config.recommender();
    let dataset = seed::generate(options, recommender.mapping(), Date::today());
    let summary = store
        .import_dataset(&dataset)
        .context("failed to write seed data")?;

    let counts = store
        .get_interaction_counts()
        .context("failed to count interactions")?;
    let report = recommender
        .data_sufficiency(&store)
        .context("failed to evaluate data sufficiency")?;
    println!(
        "seeded users={}, answers={}, quests={}, log={}",
        summary.users, summary.survey_answers, summary.quests, summary.recommendations
    );
    println!(
        "engaged: {} interactions from {} users on {} quests. gate {} (sufficient: {})",
        counts.total_interactions,
        counts.active_users,
        counts.active_quests,
        report.requirements_label(),
        report.is_sufficient
    );
    Ok(())
}
