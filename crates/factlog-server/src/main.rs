//! factlog: extract dated decisions from call logs.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use factlog_core::{DateKey, FactLogConfig};
use factlog_server::{build_router, AppState};
use factlog_store::FactStore;

fn resolve_data_dir() -> PathBuf {
    std::env::var("FACTLOG_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn print_help() {
    println!("factlog — extract dated decisions from call logs");
    println!();
    println!("Usage: factlog [command]");
    println!();
    println!("Commands:");
    println!("  (none)                     Start the server");
    println!("  process <question> <url>...  Process documents and print the results");
    println!("  facts <YYYY-MM-DD>         Print stored facts for a date");
    println!("  dates                      Print the range of stored dates");
    println!("  help                       Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let data_dir = resolve_data_dir();

    if args.len() > 1 {
        match args[1].as_str() {
            "process" => {
                if args.len() < 4 {
                    eprintln!("Usage: factlog process <question> <url>...");
                    std::process::exit(1);
                }
                return run_process(data_dir, args[2].clone(), args[3..].to_vec()).await;
            }
            "facts" => {
                let Some(date) = args.get(2) else {
                    eprintln!("Usage: factlog facts <YYYY-MM-DD>");
                    std::process::exit(1);
                };
                return print_facts(data_dir, date);
            }
            "dates" => return print_dates(data_dir),
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'factlog help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    info!("Data directory: {}", data_dir.display());

    let config = FactLogConfig::from_env(&data_dir)?;
    let port = config.port;
    let state = Arc::new(AppState::from_config(config)?);

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("factlog server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_process(data_dir: PathBuf, question: String, urls: Vec<String>) -> anyhow::Result<()> {
    let config = FactLogConfig::from_env(&data_dir)?;
    let state = AppState::from_config(config)?;

    let report = state.coordinator.process(question, urls).await;
    let view = state.coordinator.status();

    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(facts) = view.facts_by_day {
        println!("{}", serde_json::to_string_pretty(&facts)?);
    }

    if report.failed_count() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn open_store(data_dir: PathBuf) -> anyhow::Result<FactStore> {
    let config = FactLogConfig::from_env(&data_dir)?;
    Ok(FactStore::open(&config.data_paths.facts_file))
}

fn print_facts(data_dir: PathBuf, date: &str) -> anyhow::Result<()> {
    let date = DateKey::parse(date)?;
    let store = open_store(data_dir)?;
    let facts = store.query_by_date(&date);
    if facts.is_empty() {
        println!("No facts for {}", date);
        return Ok(());
    }
    for entry in facts {
        println!("- {}", entry.fact);
        println!("  ({})", entry.question);
    }
    Ok(())
}

fn print_dates(data_dir: PathBuf) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    let (min, max) = store.date_range()?;
    println!("{} .. {}", min, max);
    for date in store.dates() {
        println!("  {} ({} facts)", date, store.query_by_date(&date).len());
    }
    Ok(())
}
