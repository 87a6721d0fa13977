//! Draw: one settlement window and its lifecycle status.

use crate::domain::{Decimal, Identity, TimeMs};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a draw.
///
/// Transitions are strictly forward: Pending → Running → Processing → Done.
/// At most one draw is Running and at most one is Processing at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawStatus {
    /// Pre-materialized future window, not yet accepting contributions.
    Pending,
    /// The active window accepting contributions.
    Running,
    /// Window closed; settlement in progress.
    Processing,
    /// Settled; totals and winner stamped. Immutable.
    Done,
}

impl DrawStatus {
    /// Text encoding used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawStatus::Pending => "pending",
            DrawStatus::Running => "running",
            DrawStatus::Processing => "processing",
            DrawStatus::Done => "done",
        }
    }

    /// Parse the database text encoding.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DrawStatus::Pending),
            "running" => Some(DrawStatus::Running),
            "processing" => Some(DrawStatus::Processing),
            "done" => Some(DrawStatus::Done),
            _ => None,
        }
    }
}

impl std::fmt::Display for DrawStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One settlement window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub id: String,
    /// Strictly increasing, contiguous, one per calendar slot.
    pub sequence_number: i64,
    /// Half-open window [start, end) in UTC.
    pub window_start: TimeMs,
    pub window_end: TimeMs,
    pub status: DrawStatus,
    /// Stamped when the draw reaches Done.
    pub total_collected: Option<Decimal>,
    pub fee_rate: Option<Decimal>,
    pub winner: Option<Identity>,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

impl Draw {
    /// Build a fresh pending draw for the given window.
    pub fn pending(sequence_number: i64, window_start: TimeMs, window_end: TimeMs) -> Self {
        let now = TimeMs::now();
        Draw {
            id: uuid::Uuid::new_v4().to_string(),
            sequence_number,
            window_start,
            window_end,
            status: DrawStatus::Pending,
            total_collected: None,
            fee_rate: None,
            winner: None,
            created_at: now,
            updated_at: now,
        }
    }
}
