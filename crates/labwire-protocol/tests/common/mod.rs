//! Shared helpers for protocol integration tests.

#![allow(dead_code)]

use labwire_core::SampleResult;
use labwire_protocol::{ControlByte, Session, SessionEvent, TransmissionBuilder};

/// Transmission an EC90 sends for one electrolyte panel.
pub fn electrolyte_panel(sample_id: &str, na: &str, k: &str, cl: &str) -> TransmissionBuilder {
    TransmissionBuilder::new()
        .record("H|\\^&|||EC90^1.0|||||||P|1")
        .record(format!("P|1|{sample_id}||DOE^JANE"))
        .record("O|1|||^^^Na\\^^^K\\^^^Cl")
        .record(format!("R|1|^^^Na|{na}|mmol/L"))
        .record(format!("R|2|^^^K|{k}|mmol/L"))
        .record(format!("R|3|^^^Cl|{cl}|mmol/L"))
        .record("L|1|N")
}

/// Feed `wire` in chunks of `chunk_size` bytes and collect every event.
pub fn feed_chunked(session: &mut Session, wire: &[u8], chunk_size: usize) -> Vec<SessionEvent> {
    wire.chunks(chunk_size.max(1))
        .flat_map(|chunk| session.feed(chunk))
        .collect()
}

pub fn completed(events: &[SessionEvent]) -> Vec<SampleResult> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Completed(result) => Some(result.clone()),
            _ => None,
        })
        .collect()
}

pub fn replies(events: &[SessionEvent]) -> Vec<ControlByte> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Reply(byte) => Some(*byte),
            _ => None,
        })
        .collect()
}

/// Results with the arrival timestamp cleared, for comparisons.
pub fn without_timestamps(results: Vec<SampleResult>) -> Vec<SampleResult> {
    results
        .into_iter()
        .map(|mut r| {
            r.received_at = None;
            r
        })
        .collect()
}
