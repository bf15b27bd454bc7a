use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }

    /// Word written to the PLC register: 1 for PASS, 0 for FAIL.
    pub fn register_value(&self) -> u16 {
        match self {
            Verdict::Pass => 1,
            Verdict::Fail => 0,
        }
    }
}

/// A durable inspection outcome as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub single_percent: f64,
    pub multiple_percent: f64,
    pub no_circlip_percent: f64,
    pub verdict: Verdict,
}

/// Outcome of a completed session, before the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewInspectionRecord {
    pub single_percent: f64,
    pub multiple_percent: f64,
    pub no_circlip_percent: f64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_register_values() {
        assert_eq!(Verdict::Pass.register_value(), 1);
        assert_eq!(Verdict::Fail.register_value(), 0);
    }

    #[test]
    fn verdict_strings() {
        assert_eq!(Verdict::Pass.as_str(), "PASS");
        assert_eq!(Verdict::Fail.as_str(), "FAIL");
    }
}
