use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Where the mission currently stands.  Stored in a shared
/// `MissionCell` and written by exactly one task at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MissionState {
    /// Mission is not running (never started, quota met, or aborted).
    Idle = 0,
    /// Looking for the luggage mark.
    Searching = 1,
    /// Luggage is held; heading for the delivery zone.
    CarryingLoad = 2,
    /// Aligned in front of the luggage; closing the gripper.
    PickingUp = 3,
    /// Inside the delivery zone; releasing the luggage.
    Depositing = 4,
    /// A behavior task owns the robot right now; do not dispatch another.
    Dispatched = 5,
    /// The gripper stall-seek ran past its time limit.
    Stuck = 6,
    /// A hardware call failed while a behavior was running.
    Faulted = 7,
}

impl MissionState {
    /// `true` for states that end the mission on their own.
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionState::Stuck | MissionState::Faulted)
    }
}

impl From<MissionState> for u8 {
    fn from(state: MissionState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for MissionState {
    type Error = PorterError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => MissionState::Idle,
            1 => MissionState::Searching,
            2 => MissionState::CarryingLoad,
            3 => MissionState::PickingUp,
            4 => MissionState::Depositing,
            5 => MissionState::Dispatched,
            6 => MissionState::Stuck,
            7 => MissionState::Faulted,
            other => {
                return Err(PorterError::HardwareFault {
                    component: "mission_cell".to_string(),
                    details: format!("invalid mission state byte {other}"),
                });
            }
        })
    }
}

/// Reflected-color classification reported by the color sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorClass {
    Black,
    Blue,
    Green,
    Yellow,
    Red,
    White,
    Brown,
    /// No color could be classified.
    Other,
}

/// How a motor comes to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopMode {
    /// Free-wheel to a stop.
    Coast,
    /// Passive electrical braking.
    Brake,
    /// Actively resist displacement at the current position.
    Hold,
}

/// Audio cues the brick can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Pick-up acknowledgment.
    Horn,
    Snoring,
    ErrorAlarm,
    Hello,
    Three,
    Two,
    One,
    MotorStart,
    MotorStop,
    GameOver,
}

/// The four self-contained mission routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    Search,
    PickUp,
    Carry,
    Deposit,
}

impl Behavior {
    /// The routine that serves `state`, or `None` when nothing should be
    /// dispatched for it.
    pub fn for_state(state: MissionState) -> Option<Self> {
        match state {
            MissionState::Searching => Some(Behavior::Search),
            MissionState::PickingUp => Some(Behavior::PickUp),
            MissionState::CarryingLoad => Some(Behavior::Carry),
            MissionState::Depositing => Some(Behavior::Deposit),
            _ => None,
        }
    }

    /// The state this routine is dispatched from.
    pub fn entry_state(self) -> MissionState {
        match self {
            Behavior::Search => MissionState::Searching,
            Behavior::PickUp => MissionState::PickingUp,
            Behavior::Carry => MissionState::CarryingLoad,
            Behavior::Deposit => MissionState::Depositing,
        }
    }
}

impl std::fmt::Display for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Behavior::Search => write!(f, "search"),
            Behavior::PickUp => write!(f, "pick_up"),
            Behavior::Carry => write!(f, "carry"),
            Behavior::Deposit => write!(f, "deposit"),
        }
    }
}

/// Mission progress record broadcast to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "porter-runtime::lane"
    pub source: String,
    pub payload: MissionEventPayload,
}

impl MissionEvent {
    /// Stamp `payload` with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: MissionEventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data carried by a [`MissionEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MissionEventPayload {
    BehaviorStarted {
        behavior: Behavior,
    },
    BehaviorFinished {
        behavior: Behavior,
        next: MissionState,
    },
    /// An unexpected color triggered an avoidance maneuver.
    AvoidanceManeuver {
        behavior: Behavior,
        color: ColorClass,
    },
    /// The robot was already aligned after a search stop, so search restarts.
    AlignmentSkipped {
        heading_deg: f32,
    },
    HeadingCorrected {
        offset_deg: f32,
    },
    Delivered {
        total: u32,
    },
    StallTimeout {
        after_ms: u64,
    },
    MissionEnded {
        delivered: u32,
        reason: String,
    },
}

/// Error type spanning hardware faults and mission bookkeeping violations.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PorterError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Dispatch Conflict: expected {expected:?}, found {found:?}")]
    DispatchConflict {
        expected: MissionState,
        found: MissionState,
    },

    #[error("Mission already closed")]
    MissionClosed,

    #[error("Behavior lane is still running a job")]
    LaneBusy,

    #[error("Behavior lane closed: {0}")]
    LaneClosed(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}
