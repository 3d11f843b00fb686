//! Model lifecycle events and their synchronous dispatch.
//!
//! The host calls `EventBus::dispatch` after a record is persisted. Every
//! subscribed observer runs to completion before `dispatch` returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::histogram;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::entities::{BrandSnapshot, ProductChange, ProductSnapshot};

use super::config::CacheConfig;
use super::error::CacheError;

const METRIC_EVENT_MS: &str = "catalog_cache_event_ms";

/// Monotonic sequence number assigned at dispatch.
pub type Epoch = u64;

/// A saved entity with its before and after state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityChange {
    Product(ProductChange),
    Brand(BrandSnapshot),
}

/// An entity as it was when deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Product(ProductSnapshot),
    Brand(BrandSnapshot),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    AfterSave(EntityChange),
    AfterDelete(Entity),
}

impl ModelEvent {
    /// Stable channel name, used for logs and metric labels.
    pub fn channel(&self) -> &'static str {
        match self {
            ModelEvent::AfterSave(EntityChange::Product(_)) => "product.after.save",
            ModelEvent::AfterSave(EntityChange::Brand(_)) => "brand.after.save",
            ModelEvent::AfterDelete(Entity::Product(_)) => "product.after.delete",
            ModelEvent::AfterDelete(Entity::Brand(_)) => "brand.after.delete",
        }
    }
}

/// Dispatched event with identity and ordering metadata.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub event: ModelEvent,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(event: ModelEvent, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            event,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Subscriber to model events. Observers ignore entity types they do not own.
pub trait ModelObserver: Send + Sync {
    fn after_save(&self, change: &EntityChange) -> Result<(), CacheError>;

    fn after_delete(&self, entity: &Entity) -> Result<(), CacheError>;
}

/// Typed replacement for string-named event channels.
pub struct EventBus {
    config: CacheConfig,
    observers: Vec<Arc<dyn ModelObserver>>,
    epoch_counter: AtomicU64,
}

impl EventBus {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            observers: Vec::new(),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn ModelObserver>) {
        self.observers.push(observer);
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Run every observer against the event, in subscription order.
    ///
    /// Stops at the first observer error and returns it. Returns the dispatched
    /// envelope, or `None` when caching is disabled.
    pub fn dispatch(&self, event: ModelEvent) -> Result<Option<CacheEvent>, CacheError> {
        let channel = event.channel();
        if !self.config.is_enabled() {
            debug!(channel, "Model event skipped: cache disabled");
            return Ok(None);
        }

        let started_at = Instant::now();
        let envelope = CacheEvent::new(event, self.next_epoch());

        info!(
            event_id = %envelope.id,
            event_epoch = envelope.epoch,
            channel,
            observers = self.observers.len(),
            "Model event dispatched"
        );

        for observer in &self.observers {
            match &envelope.event {
                ModelEvent::AfterSave(change) => observer.after_save(change)?,
                ModelEvent::AfterDelete(entity) => observer.after_delete(entity)?,
            }
        }

        histogram!(METRIC_EVENT_MS, "channel" => channel)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        Ok(Some(envelope))
    }
}
