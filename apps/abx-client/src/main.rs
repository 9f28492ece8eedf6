//! ABX Client Binary
//!
//! Interactive operator console over the exchange server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin abx-client
//! ```
//!
//! # Menu
//!
//! - `1`: Stream all packets, backfill gaps, print sorted by sequence
//! - `2`: Request one packet by sequence number (1-255)
//! - `0`: Exit
//!
//! # Environment Variables
//!
//! - `ABX_HOST`: Server host (default: 127.0.0.1)
//! - `ABX_PORT`: Server port (default: 3000)
//! - `ABX_CONNECT_TIMEOUT_MS`: Connect timeout (default: 5000)
//! - `ABX_READ_TIMEOUT_MS`: Read stall threshold (default: 5000)
//! - `ABX_BACKFILL_MAX_ATTEMPTS`: Resend attempts per gap (default: 1)
//! - `ABX_BACKFILL_RETRY_DELAY_MS`: First retry delay (default: 100)
//! - `ABX_OUTPUT`: text | json (default: text)
//! - `ABX_METRICS_PORT`: Prometheus port, 0 disables (default: 0)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log filter (default: abx_client=info)

use std::io::Write;
use std::sync::Arc;

use abx_client::infrastructure::telemetry;
use abx_client::{
    AbxTransport, ClientConfig, OrderRecord, OutputFormat, ReconciliationService, RequestError,
    init_metrics, parse_sequence_input,
};
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type Console = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialize telemetry")?;

    let config = ClientConfig::from_env().context("failed to load configuration")?;
    init_metrics(config.metrics_port).context("failed to start metrics exporter")?;
    log_config(&config);

    let transport = Arc::new(AbxTransport::new(
        config.endpoint.clone(),
        config.transport.clone(),
    ));
    let service = ReconciliationService::new(transport, config.backfill.clone());

    let mut console = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_menu()?;
        let Some(choice) = console.next_line().await? else {
            break;
        };

        match choice.trim() {
            "0" => {
                println!("Exiting...");
                break;
            }
            "1" => stream_all(&service, config.output).await?,
            "2" => {
                if !resend_one(&service, &mut console, config.output).await? {
                    break;
                }
            }
            _ => println!(
                "Invalid option.\n Choose 1 to stream all packets or 2 to resend a packet or 0 to Exit."
            ),
        }
    }

    tracing::info!("ABX client stopped");
    Ok(())
}

async fn stream_all(
    service: &ReconciliationService<AbxTransport>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let report = service.reconcile().await;
    for record in &report.records {
        print_record(record, output)?;
    }

    if let Some(fault) = &report.stream_fault {
        println!("Network error: {fault}");
    }
    if !report.unresolved.is_empty() {
        let missing: Vec<String> = report.unresolved.iter().map(ToString::to_string).collect();
        println!("Missing sequences: {}", missing.join(", "));
    }
    Ok(())
}

/// Returns `false` when stdin closed before a sequence was entered.
async fn resend_one(
    service: &ReconciliationService<AbxTransport>,
    console: &mut Console,
    output: OutputFormat,
) -> anyhow::Result<bool> {
    prompt("Enter the sequence number to request: ")?;
    let Some(input) = console.next_line().await? else {
        return Ok(false);
    };

    let outcome = match parse_sequence_input(&input) {
        Ok(sequence) => service.request_packet_by_sequence(sequence).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(Some(record)) => print_record(&record, output)?,
        Ok(None) => println!("No packet received for that sequence."),
        Err(RequestError::InvalidSequence(_) | RequestError::Parse(_)) => {
            println!("Invalid sequence number.");
        }
        Err(RequestError::Transport(e)) => println!("Network error: {e}"),
    }
    Ok(true)
}

fn print_record(record: &OrderRecord, output: OutputFormat) -> anyhow::Result<()> {
    match output {
        OutputFormat::Text => println!("{record}"),
        OutputFormat::Json => println!("{}", serde_json::to_string(record)?),
    }
    Ok(())
}

fn print_menu() -> std::io::Result<()> {
    println!();
    println!("Select request type:");
    println!("0. Exit");
    println!("1. Stream all packets");
    println!("2. Resend packet by sequence number");
    prompt("Enter 1 or 2: ")
}

fn prompt(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{text}")?;
    stdout.flush()
}

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    tracing::info!(
        endpoint = %config.endpoint,
        connect_timeout_ms = config.transport.connect_timeout.as_millis(),
        read_timeout_ms = config.transport.read_timeout.as_millis(),
        backfill_attempts = config.backfill.max_attempts,
        output = config.output.as_str(),
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
