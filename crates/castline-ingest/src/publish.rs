//! Publisher implementations for the ingest service.

use castline_core::{event::DomainEvent, publish::EventPublisher};
use serde::Serialize;
use tracing::warn;

/// Writes each published event as one JSON line on stdout, ready to feed
/// a real queue producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutPublisher;

#[derive(Serialize)]
struct Envelope<'a> {
  high_priority: bool,
  #[serde(flatten)]
  event:         &'a DomainEvent,
}

impl EventPublisher for StdoutPublisher {
  async fn publish(&self, event: DomainEvent, high_priority: bool) {
    match serde_json::to_string(&Envelope { high_priority, event: &event }) {
      Ok(line) => println!("{line}"),
      Err(error) => {
        warn!(%error, kind = event.kind(), "failed to serialize domain event");
      }
    }
  }
}
