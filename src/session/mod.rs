pub mod controller;
pub mod events;
pub mod worker;

pub use controller::InspectionController;
pub use events::{ChannelSink, EventSink, InspectionEvent, LogLevel, SessionReport};
pub use worker::{run_session, SessionError, SessionOutcome};
