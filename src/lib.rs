pub mod alert;
pub mod capture;
pub mod classify;
pub mod config;
pub mod db;
pub mod models;
pub mod plc;
pub mod session;
pub mod utils;

pub use alert::{AlertPlayer, AlertingSink};
pub use capture::{CaptureError, Frame, FrameSource};
pub use classify::{Classifier, ClassifierError};
pub use config::{ConfigStore, InspectionConfig, PlcConfig};
pub use db::{Database, ResultStore, StoreError};
pub use models::{DailySummary, InspectionRecord, NewInspectionRecord, Verdict};
pub use plc::{Actuator, ActuatorError};
pub use session::{
    run_session, ChannelSink, EventSink, InspectionController, InspectionEvent, LogLevel,
    SessionError, SessionOutcome, SessionReport,
};
