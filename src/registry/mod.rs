//! Notification broker: client registry, subscription index and fan-out
//!
//! # Architecture
//!
//! ```text
//!                             Arc<Broker>
//!               ┌──────────────────────────────────────┐
//!               │ state: RwLock<{                      │
//!               │   clients: id → outbox Sender,       │
//!               │   index:   key ↔ client ids,         │
//!               │ }>                                   │
//!               │ lanes: [Mutex<()>] (by key hash)     │
//!               │ store: Arc<dyn DurableStore>         │
//!               └──────────────────┬───────────────────┘
//!                                  │
//!        ┌─────────────────────────┼─────────────────────────┐
//!        │                         │                         │
//!        ▼                         ▼                         ▼
//!   [HTTP writer]            [Subscriber]              [Subscriber]
//!   broker.set()             outbox.recv()             outbox.recv()
//!        │                         │                         │
//!        └──► commit ──► try_send ─┴──► JSON line ──► TCP ◄──┘
//! ```
//!
//! # Consistency
//!
//! A write holds its key's lane across commit and fan-out, and a subscribe
//! holds the same lane across its catch-up read and delivery. Per key, a
//! subscriber therefore observes values in commit order and never sees a
//! stale value after a fresh one. The contract offered to adapters is
//! at-least-once and monotonic per key; with the lanes in place a
//! continuously subscribed client receives each committed value once.
//!
//! # Slow subscribers
//!
//! Outboxes are bounded and fan-out only uses `try_send`, so a writer never
//! waits for a subscriber. A full outbox is resolved by the configured
//! [`OverflowPolicy`].

pub mod broker;
pub mod clients;
pub mod config;
pub mod entry;
pub mod error;
pub mod index;
pub mod update;

pub use broker::Broker;
pub use clients::ClientTable;
pub use config::{BrokerConfig, OverflowPolicy};
pub use entry::{ClientEntry, ClientHandle};
pub use error::BrokerError;
pub use index::SubscriptionIndex;
pub use update::{ClientId, Update};
