//! RS-232 link.
//!
//! The serial line is driven with blocking I/O on a dedicated thread. Reads
//! use a short timeout so the loop can notice a shutdown request between
//! bytes.

use labwire_core::constants::DEFAULT_BAUD_RATE;
use labwire_core::{SampleResult, SinkError};
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::info;

use crate::error::LinkError;
use crate::link::{LinkConfig, LinkSummary, serve_blocking};

#[cfg(windows)]
const DEFAULT_SERIAL_PORT: &str = "COM5";
#[cfg(not(windows))]
const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

/// Serial line settings. 8 data bits, no parity, one stop bit.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path (`COM5`, `/dev/ttyUSB0`)
    pub port: String,

    pub baud_rate: u32,

    /// Read timeout; bounds how long a shutdown request may go unnoticed
    pub read_timeout: Duration,

    pub link: LinkConfig,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(500),
            link: LinkConfig::default(),
        }
    }
}

impl SerialConfig {
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }
}

/// Open the configured port.
///
/// # Errors
///
/// Returns `LinkError::Serial` if the device does not exist, is busy, or
/// rejects the settings.
pub fn open_port(config: &SerialConfig) -> Result<Box<dyn serialport::SerialPort>, LinkError> {
    let port = serialport::new(&config.port, config.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(config.read_timeout)
        .open()?;

    info!(
        port = %config.port,
        baud_rate = config.baud_rate,
        "Serial port open, waiting for analyzer"
    );
    Ok(port)
}

/// Open the port and serve it until `shutdown` is set or the device goes
/// away.
///
/// Blocks the calling thread.
pub fn serve_serial<F>(
    config: &SerialConfig,
    shutdown: &AtomicBool,
    deliver: F,
) -> Result<LinkSummary, LinkError>
where
    F: FnMut(SampleResult) -> Result<(), SinkError>,
{
    let mut port = open_port(config)?;
    let summary = serve_blocking(port.as_mut(), &config.link, shutdown, deliver)?;

    info!(
        port = %config.port,
        delivered = summary.delivered,
        sink_errors = summary.sink_errors.len(),
        "Serial link closed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert!(!config.port.is_empty());
        assert_eq!(config.read_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_missing_port_fails_to_open() {
        let config = SerialConfig::default().port("/definitely/not/a/serial/port");
        assert!(matches!(open_port(&config), Err(LinkError::Serial(_))));
    }
}
