//! kb-verify: command-line client for the Kickbox verification API.
//!
//! Replies are printed to stdout as pretty JSON; logs go to stderr.
//! The API key is read from `KICKBOX_API_KEY`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use kb_telemetry::{init_logging, TelemetryConfig};
use kb_verifier::{
    BatchOptions, BatchPayload, HttpVerifier, SandboxVerifier, Verifier, VerifierConfigBuilder,
    VerifyOptions, BASE_URL_EU,
};

/// kb-verify: Kickbox email verification from the command line
#[derive(Parser, Debug)]
#[command(name = "kb-verify")]
#[command(about = "Verify email addresses with the Kickbox API", version)]
struct Args {
    /// Answer from the local sandbox instead of the remote service
    #[arg(long, global = true)]
    sandbox: bool,

    /// Use the EU endpoint
    #[arg(long, global = true, conflicts_with = "base_url")]
    eu: bool,

    /// Override the API endpoint (also KICKBOX_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a single address
    Verify {
        email: String,

        /// Time the service may spend on the verification, in milliseconds (max 30000)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Submit a CSV file of addresses for batch verification
    Batch {
        csv: PathBuf,

        /// Job name reported by the service
        #[arg(long)]
        filename: Option<String>,

        /// URL notified when the job completes
        #[arg(long)]
        callback: Option<String>,
    },

    /// Show the state of a batch job
    Status { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if args.verbose {
        telemetry = telemetry.with_log_level("debug");
    }
    init_logging(&telemetry)?;

    let verifier = build_verifier(&args)?;

    // Ctrl-C cancels the in-flight call
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling call");
            on_signal.cancel();
        }
    });

    match args.command {
        Command::Verify { email, timeout_ms } => {
            let mut options = VerifyOptions::new().cancel_on(cancel);
            if let Some(ms) = timeout_ms {
                options = options.timeout(Duration::from_millis(ms));
            }
            let verification = verifier
                .verify(&email, options)
                .await
                .with_context(|| format!("verifying {email}"))?;
            print_json(&verification)
        }
        Command::Batch {
            csv,
            filename,
            callback,
        } => {
            let file = tokio::fs::File::open(&csv)
                .await
                .with_context(|| format!("opening {}", csv.display()))?;

            let mut options = BatchOptions::new().cancel_on(cancel);
            if let Some(filename) = filename {
                options = options.filename(filename);
            }
            if let Some(callback) = callback {
                options = options.callback(callback);
            }

            let submission = verifier
                .verify_batch(BatchPayload::from_reader(file), options)
                .await
                .context("submitting batch")?;
            info!(id = submission.id, "Batch submitted");
            print_json(&submission)
        }
        Command::Status { id } => {
            let status = verifier
                .batch_status(&id)
                .await
                .with_context(|| format!("fetching status of batch {id}"))?;
            print_json(&status)
        }
    }
}

fn build_verifier(args: &Args) -> Result<Box<dyn Verifier>> {
    if args.sandbox {
        info!("Using sandbox verifier");
        return Ok(Box::new(SandboxVerifier::new()));
    }

    let mut builder = VerifierConfigBuilder::from_env();
    if args.eu {
        builder = builder.base_url(BASE_URL_EU);
    } else if let Some(base_url) = &args.base_url {
        builder = builder.base_url(base_url.as_str());
    }
    let config = builder
        .build()
        .context("building verifier configuration (is KICKBOX_API_KEY set?)")?;

    Ok(Box::new(HttpVerifier::new(config)?))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
