#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod link;
mod service;
mod support;
