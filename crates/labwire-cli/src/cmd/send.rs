use anyhow::{Context, bail};
use labwire_network::{AnalyzerClient, AnalyzerClientConfig};
use labwire_protocol::TransmissionBuilder;
use std::time::Duration;
use tracing::info;

use super::SendArgs;

/// Panel sent when no `--test` is given.
const DEFAULT_PANEL: [&str; 3] = ["Na=140:mmol/L", "K=4.0:mmol/L", "Cl=102:mmol/L"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct TestEntry {
    code: String,
    value: String,
    unit: Option<String>,
}

impl std::str::FromStr for TestEntry {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let Some((code, rest)) = s.split_once('=') else {
            bail!("expected CODE=VALUE[:UNIT], got {s:?}");
        };
        let (value, unit) = match rest.split_once(':') {
            Some((value, unit)) => (value, Some(unit.to_string())),
            None => (rest, None),
        };
        if code.trim().is_empty() || value.trim().is_empty() {
            bail!("test code and value must not be empty in {s:?}");
        }
        Ok(Self {
            code: code.trim().to_string(),
            value: value.trim().to_string(),
            unit,
        })
    }
}

fn transmission(args: &SendArgs) -> anyhow::Result<TransmissionBuilder> {
    let entries: Vec<TestEntry> = if args.tests.is_empty() {
        DEFAULT_PANEL.iter().map(|s| s.parse()).collect::<anyhow::Result<_>>()?
    } else {
        args.tests.iter().map(|s| s.parse()).collect::<anyhow::Result<_>>()?
    };

    let patient = args.patient.as_deref().unwrap_or("");
    let mut builder = TransmissionBuilder::new()
        .records_per_frame(args.records_per_frame)
        .record("H|\\^&|||EC90")
        .record(format!("P|1|{}||{patient}", args.sample_id))
        .record(format!("O|1|{}", args.sample_id));
    for (seq, entry) in entries.iter().enumerate() {
        builder = builder.record(format!(
            "R|{}|^^{}|{}|{}",
            seq + 1,
            entry.code,
            entry.value,
            entry.unit.as_deref().unwrap_or("")
        ));
    }
    Ok(builder.record("L|1|N"))
}

pub async fn run(args: SendArgs) -> anyhow::Result<()> {
    let builder = transmission(&args)?;
    let config = AnalyzerClientConfig {
        server_addr: args.host,
        timeout: Duration::from_millis(args.timeout_ms),
    };

    let mut client = AnalyzerClient::connect(config)
        .await
        .with_context(|| format!("connecting to {}", args.host))?;

    for n in 1..=args.count {
        let report = client.send_transmission(&builder).await?;
        info!(
            transmission = n,
            frames = report.frames_sent,
            acks = report.acks,
            naks = report.naks,
            "Transmission sent"
        );
        println!(
            "{}: {} frames, {} ACK, {} NAK",
            args.sample_id, report.frames_sent, report.acks, report.naks
        );
    }

    client.close().await?;
    Ok(())
}
