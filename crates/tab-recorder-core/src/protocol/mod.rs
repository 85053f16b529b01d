mod command;
mod directive;
mod status;

pub use {
    command::{Ack, Command, CommandReply},
    directive::Directive,
    status::SessionStatus,
};
