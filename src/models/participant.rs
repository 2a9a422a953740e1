//! Participant and its registration data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a participant (the profile id from the identity service).
pub type ParticipantId = Uuid;

/// A participant registered in one tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Points accrued from won matches.
    pub points: u32,
    pub registered_at: DateTime<Utc>,
}

impl Participant {
    /// Create a participant with zero points, registered now.
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            points: 0,
            registered_at: Utc::now(),
        }
    }

    /// Credit points for a won match.
    pub fn add_points(&mut self, delta: u32) {
        self.points = self.points.saturating_add(delta);
    }
}
