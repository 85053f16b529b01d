mod destination;
#[allow(clippy::module_inception)]
mod session;
mod state;
mod timer;

pub use {
    destination::{
        DEFAULT_FILENAME, DEFAULT_FOLDER, Destination, DestinationParts, MEDIA_EXTENSION,
    },
    session::Session,
    state::{CaptureToken, SessionState, WorkerId},
    timer::{ElapsedTimer, format_timer},
};
