use anyhow::Context;
use labwire_core::ResultSink;
use labwire_network::{AnalyzerListener, LinkConfig, SerialConfig, TcpListenerConfig, serve_serial};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tracing::{info, warn};

use super::{ListenSerialArgs, ListenTcpArgs};

pub async fn tcp(args: ListenTcpArgs) -> anyhow::Result<()> {
    let table = args.host.reference_table()?;
    let link = LinkConfig::default().session(args.host.session_config(Arc::clone(&table)));
    let sink = Arc::new(args.host.sink(table).await?);

    let config = TcpListenerConfig::default()
        .bind_addr(args.bind)
        .max_connections(args.max_connections)
        .link(link);
    let listener = AnalyzerListener::bind(config).await?;

    if args.once {
        let summary = listener.serve_once(sink.as_ref()).await?;
        info!(
            delivered = summary.delivered,
            sink_errors = summary.sink_errors.len(),
            "Link closed"
        );
        return Ok(());
    }

    listener.run(sink, shutdown_signal()).await?;
    Ok(())
}

pub async fn serial(args: ListenSerialArgs) -> anyhow::Result<()> {
    let table = args.host.reference_table()?;
    let link = LinkConfig::default().session(args.host.session_config(Arc::clone(&table)));
    let sink = Arc::new(args.host.sink(table).await?);

    let mut config = SerialConfig::default().baud_rate(args.baud_rate).link(link);
    if let Some(port) = args.port {
        config = config.port(port);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let stop = Arc::clone(&shutdown);
    tokio::spawn(async move {
        shutdown_signal().await;
        stop.store(true, Ordering::Relaxed);
    });

    // The serial link blocks; deliveries hop back onto the runtime.
    let handle = Handle::current();
    let summary = tokio::task::spawn_blocking(move || {
        serve_serial(&config, &shutdown, |result| {
            handle.block_on(sink.deliver(result))
        })
    })
    .await
    .context("serial link task failed")??;

    info!(
        delivered = summary.delivered,
        sink_errors = summary.sink_errors.len(),
        abandoned = summary.stats.sessions_abandoned,
        "Serial link closed"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl+C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
