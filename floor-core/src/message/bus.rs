//! Event broker core
//!
//! A `tokio::sync::broadcast` channel fans every event out to all live
//! subscriptions; each subscription applies its own [`EventFilter`]. A
//! `DashMap` registry tracks who is listening so subscribe, unsubscribe and
//! publish can run concurrently.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::Stream;
use serde::Serialize;
use shared::message::{FloorEvent, ServiceRequestType};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::filter::EventFilter;
use crate::utils::NotificationFailure;

/// What a subscriber receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Event(FloorEvent),
    /// The subscriber fell behind and `missed` events were dropped;
    /// re-read all canonical state for the filter
    Resync { missed: u64 },
}

/// Registry entry for a live subscription
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberInfo {
    pub id: u64,
    /// Consumer label (e.g. "kitchen-display")
    pub consumer: String,
    pub filter: EventFilter,
    pub subscribed_at: i64,
}

/// 事件总线 - 负责事件扇出
#[derive(Debug, Clone)]
pub struct EventBroker {
    tx: broadcast::Sender<FloorEvent>,
    subscribers: Arc<DashMap<u64, SubscriberInfo>>,
    next_id: Arc<AtomicU64>,
}

impl EventBroker {
    /// Create a broker with the given broadcast capacity (per-subscriber backlog)
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            subscribers: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Publish to all subscribers; returns how many receivers got it
    pub fn publish(&self, event: FloorEvent) -> Result<usize, NotificationFailure> {
        self.tx
            .send(event)
            .map_err(|_| NotificationFailure::NoSubscribers)
    }

    /// Publish and log any failure; never fails the caller
    pub fn notify(&self, event: FloorEvent) {
        let kind = event.entity_kind();
        let entity_id = event.entity_id().to_string();
        match self.publish(event) {
            Ok(receivers) => {
                tracing::debug!(kind = %kind, entity_id = %entity_id, receivers, "Event published");
            }
            Err(e) => {
                tracing::warn!(kind = %kind, entity_id = %entity_id, error = %e, "Event not delivered");
            }
        }
    }

    /// Customer-facing call-waiter / request-bill
    pub fn publish_service_request(
        &self,
        restaurant_id: impl Into<String>,
        table_id: impl Into<String>,
        request_type: ServiceRequestType,
    ) {
        self.notify(FloorEvent::ServiceRequestCreated {
            table_id: table_id.into(),
            restaurant_id: restaurant_id.into(),
            request_type,
        });
    }

    /// Register a filtered subscription
    pub fn subscribe(&self, consumer: impl Into<String>, filter: EventFilter) -> EventSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let info = SubscriberInfo {
            id,
            consumer: consumer.into(),
            filter: filter.clone(),
            subscribed_at: shared::util::now_millis(),
        };
        tracing::info!(subscriber = id, consumer = %info.consumer, restaurant_id = %filter.restaurant_id, "Subscriber registered");
        self.subscribers.insert(id, info);

        EventSubscription {
            id,
            filter,
            rx: self.tx.subscribe(),
            registry: self.subscribers.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Snapshot of live subscribers
    pub fn subscribers(&self) -> Vec<SubscriberInfo> {
        let mut list: Vec<SubscriberInfo> =
            self.subscribers.iter().map(|entry| entry.value().clone()).collect();
        list.sort_by_key(|info| info.id);
        list
    }
}

/// A live, filtered event stream; dropping it unsubscribes
#[derive(Debug)]
pub struct EventSubscription {
    id: u64,
    filter: EventFilter,
    rx: broadcast::Receiver<FloorEvent>,
    registry: Arc<DashMap<u64, SubscriberInfo>>,
}

impl EventSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Next matching delivery; `None` once the broker is gone
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(Delivery::Event(event)),
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(subscriber = self.id, missed, "Subscriber lagged, resync required");
                    return Some(Delivery::Resync { missed });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<Delivery> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Some(Delivery::Event(event)),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!(subscriber = self.id, missed, "Subscriber lagged, resync required");
                    return Some(Delivery::Resync { missed });
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Delivery> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            let delivery = sub.recv().await?;
            Some((delivery, sub))
        })
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
        tracing::debug!(subscriber = self.id, "Subscriber removed");
    }
}
