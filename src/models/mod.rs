pub mod record;

pub use record::{DailySummary, InspectionRecord, NewInspectionRecord, Verdict};
