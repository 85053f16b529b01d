mod fallback;
mod registry;

pub use {
    fallback::{DiscardFallback, FallbackTransport},
    registry::{
        Delivered, DeliveryPath, Dropped, LinkId, LinkRegistry, PendingHandoff, SendOutcome,
        Teardown, WorkerSender,
    },
};
