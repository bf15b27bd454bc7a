use thiserror::Error;

#[derive(Debug, Error)]
#[error("PLC write to {register} failed: {reason}")]
pub struct ActuatorError {
    pub register: String,
    pub reason: String,
}

/// Downstream line equipment, seen as a single register write. The connection
/// is established and owned by the deployment; a failed write is reported and
/// never retried by the session.
pub trait Actuator: Send + Sync {
    fn write(&self, register: &str, value: u16) -> Result<(), ActuatorError>;
}
