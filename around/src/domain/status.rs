//! Location permission status

use serde::{Deserialize, Serialize};

/// Current location permission granted to the app
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorizationStatus {
    /// The user has not been asked yet
    #[default]
    Undetermined,
    /// Background updates permitted
    AuthorizedAlways,
    /// Foreground only; not enough for tracking
    AuthorizedWhileInUse,
    Denied,
    Restricted,
}

impl AuthorizationStatus {
    /// Only background permission is enough to track a walking user
    pub fn permits_tracking(&self) -> bool {
        matches!(self, AuthorizationStatus::AuthorizedAlways)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::Undetermined => "undetermined",
            AuthorizationStatus::AuthorizedAlways => "authorized-always",
            AuthorizationStatus::AuthorizedWhileInUse => "authorized-while-in-use",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::Restricted => "restricted",
        }
    }
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthorizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "undetermined" | "not-determined" => Ok(Self::Undetermined),
            "authorized-always" | "always" => Ok(Self::AuthorizedAlways),
            "authorized-while-in-use" | "while-in-use" => Ok(Self::AuthorizedWhileInUse),
            "denied" => Ok(Self::Denied),
            "restricted" => Ok(Self::Restricted),
            _ => Err(format!("Unknown authorization status: {}", s)),
        }
    }
}
