#[allow(clippy::module_inception)]
mod coordinator;
mod service;
mod settings;

pub use {
    coordinator::Coordinator,
    service::{CoordinatorHandle, CoordinatorService},
    settings::{DEFAULT_STOP_TIMEOUT, SessionSettings},
};
