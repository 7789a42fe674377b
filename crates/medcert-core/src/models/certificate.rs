use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A medical certificate submitted for homologation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub issued_on: Date,
    pub days_of_leave: u32,
    /// `None` when the certificate does not disclose the diagnosis.
    pub cid_code: Option<String>,
    pub homologated_on: Date,
    pub created_at: jiff::Timestamp,
}
