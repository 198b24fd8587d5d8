//! Domain events: the `Event` contract, tenant-scoped envelopes and the
//! publish/subscribe bus used to hand committed facts to downstream consumers
//! (notifications, audit, integrations).

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod tenant;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use tenant::TenantScoped;
