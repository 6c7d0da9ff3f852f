//! Ephemeral per-session state: motion, screen and the tracking session

use serde::{Deserialize, Serialize};

/// Raw classifier output from the motion source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    Walking,
    Stationary,
    Running,
    Automotive,
    Cycling,
    Unknown,
}

impl ActivityKind {
    /// Every category other than walking collapses to "not walking"
    pub fn motion_state(&self) -> MotionState {
        match self {
            ActivityKind::Walking => MotionState::Walking,
            _ => MotionState::Stationary,
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "walking" => Ok(Self::Walking),
            "stationary" => Ok(Self::Stationary),
            "running" => Ok(Self::Running),
            "automotive" => Ok(Self::Automotive),
            "cycling" => Ok(Self::Cycling),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Unknown activity: {}", s)),
        }
    }
}

/// Debounced motion state derived from classifications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MotionState {
    Walking,
    #[default]
    Stationary,
}

/// Sampled screen state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenState {
    Locked,
    #[default]
    Unlocked,
}

/// Bookkeeping for one tracking session, owned by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingSession {
    #[serde(rename = "motion-subscription-active")]
    pub motion_subscription_active: bool,
    #[serde(rename = "screen-timer-active")]
    pub screen_timer_active: bool,
    #[serde(rename = "elapsed-ticks")]
    pub elapsed_ticks: u32,
    pub threshold: u32,
}

impl TrackingSession {
    pub fn new(threshold: u32) -> Self {
        Self {
            motion_subscription_active: false,
            screen_timer_active: false,
            elapsed_ticks: 0,
            threshold,
        }
    }
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new(crate::DEFAULT_THRESHOLD)
    }
}
