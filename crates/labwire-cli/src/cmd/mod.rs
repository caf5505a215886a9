use anyhow::Context;
use clap::{Args, Subcommand};
use labwire_core::ReferenceTable;
use labwire_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_TCP_PORT};
use labwire_protocol::{AssemblerConfig, SessionConfig};
use labwire_storage::{Database, DatabaseConfig, SqliteSampleSink};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::output::{CliSink, OutputFormat, ResultPrinter};

pub mod checksum;
pub mod listen;
pub mod send;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept analyzer connections over TCP.
    ListenTcp(ListenTcpArgs),
    /// Serve an analyzer on a serial line.
    ListenSerial(ListenSerialArgs),
    /// Act as the analyzer and send a transmission to a host.
    Send(SendArgs),
    /// Compute the checksum of a frame payload.
    Checksum(ChecksumArgs),
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::ListenTcp(args) => listen::tcp(args).await,
        Command::ListenSerial(args) => listen::serial(args).await,
        Command::Send(args) => send::run(args).await,
        Command::Checksum(args) => checksum::run(&args),
    }
}

/// Settings shared by the listen commands.
#[derive(Args, Debug)]
pub struct HostArgs {
    /// Stop after the first completed transmission.
    #[arg(long)]
    pub one_shot: bool,

    /// Answer frames failing checksum validation with NAK instead of ACK.
    #[arg(long)]
    pub nak_on_checksum_error: bool,

    /// JSON file with reference ranges. Defaults to the electrolyte panel.
    #[arg(long, value_name = "FILE", env = "LABWIRE_REFERENCE_RANGES")]
    pub reference_ranges: Option<PathBuf>,

    /// SQLite database receiving every result.
    #[arg(long, value_name = "FILE", env = "LABWIRE_DB")]
    pub db: Option<PathBuf>,

    /// How results are printed on stdout.
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub output: OutputFormat,
}

impl HostArgs {
    pub fn reference_table(&self) -> anyhow::Result<Arc<ReferenceTable>> {
        let table = match &self.reference_ranges {
            Some(path) => ReferenceTable::load(path)
                .with_context(|| format!("loading reference ranges from {}", path.display()))?,
            None => ReferenceTable::default(),
        };
        Ok(Arc::new(table))
    }

    pub fn session_config(&self, table: Arc<ReferenceTable>) -> SessionConfig {
        SessionConfig::default()
            .one_shot(self.one_shot)
            .assembler(AssemblerConfig::default().nak_on_checksum_error(self.nak_on_checksum_error))
            .reference_table(table)
    }

    /// Open the database if one was requested and build the result sink.
    pub async fn sink(&self, table: Arc<ReferenceTable>) -> anyhow::Result<CliSink> {
        let store = match &self.db {
            Some(path) => {
                let config = DatabaseConfig::new(path);
                let db = Database::new(config)
                    .await
                    .with_context(|| format!("opening database {}", path.display()))?;
                info!(path = %path.display(), "Storing results");
                Some(SqliteSampleSink::new(db.pool().clone()))
            }
            None => None,
        };

        Ok(CliSink::new(ResultPrinter::new(self.output, table), store))
    }
}

#[derive(Args, Debug)]
pub struct ListenTcpArgs {
    /// Address to listen on.
    #[arg(
        long,
        value_name = "ADDR",
        env = "LABWIRE_BIND",
        default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_TCP_PORT))
    )]
    pub bind: SocketAddr,

    /// Maximum number of analyzers connected at once.
    #[arg(long, default_value_t = 16)]
    pub max_connections: usize,

    /// Serve a single connection, then exit.
    #[arg(long)]
    pub once: bool,

    #[command(flatten)]
    pub host: HostArgs,
}

#[derive(Args, Debug)]
pub struct ListenSerialArgs {
    /// Serial device (COM5, /dev/ttyUSB0).
    #[arg(long, value_name = "DEVICE", env = "LABWIRE_SERIAL_PORT")]
    pub port: Option<String>,

    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    #[command(flatten)]
    pub host: HostArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Host to connect to.
    #[arg(
        long,
        value_name = "ADDR",
        env = "LABWIRE_HOST",
        default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_TCP_PORT))
    )]
    pub host: SocketAddr,

    /// Sample identifier sent in the patient record.
    #[arg(long, default_value = "S100")]
    pub sample_id: String,

    /// Patient name, components separated by `^`.
    #[arg(long)]
    pub patient: Option<String>,

    /// Result as CODE=VALUE or CODE=VALUE:UNIT. Repeatable.
    #[arg(long = "test", value_name = "CODE=VALUE[:UNIT]")]
    pub tests: Vec<String>,

    /// Records packed into each frame.
    #[arg(long, default_value_t = 1)]
    pub records_per_frame: usize,

    /// Number of transmissions to send.
    #[arg(long, default_value_t = 1)]
    pub count: usize,

    /// Reply timeout in milliseconds.
    #[arg(long, default_value_t = 3000)]
    pub timeout_ms: u64,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    /// Frame payload. `\r` separates records.
    pub payload: String,

    /// Also print the complete frame with this sequence digit.
    #[arg(long)]
    pub sequence: Option<u8>,
}
