//! The downstream event publisher collaborator.

use std::future::Future;

use crate::event::DomainEvent;

/// Abstraction over the downstream queue producer.
///
/// Delivery is at-least-once and ordering is not guaranteed across
/// partitions. Publishing is fire-and-forget from the processor's
/// perspective: delivery failures are the publisher's own concern (e.g.
/// its internal retry queue), so the method is infallible.
pub trait EventPublisher: Send + Sync {
  /// Publish one domain event. `high_priority` requests expedited
  /// delivery where the backing queue supports it.
  fn publish(
    &self,
    event: DomainEvent,
    high_priority: bool,
  ) -> impl Future<Output = ()> + Send + '_;
}
