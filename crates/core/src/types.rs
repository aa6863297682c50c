use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Physical locker number (1-based, fixed range provisioned at start-up).
pub type LockerId = i64;

/// Loan primary key. Monotonically increasing, never reused.
pub type LoanId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// CardId
// ---------------------------------------------------------------------------

/// Opaque identifier read from an RFID card.
///
/// Surrounding whitespace is stripped so that the same card read through
/// different adapters (SPI reader, keyboard-wedge USB reader) compares equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation("card id must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CardId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// Occupancy
// ---------------------------------------------------------------------------

/// Whether the shared item currently sits inside a locker.
///
/// `HoldsItem` is the state a borrower can take from; a return puts the
/// locker back into `HoldsItem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Occupancy {
    HoldsItem,
    Empty,
}

impl Occupancy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HoldsItem => "HOLDS_ITEM",
            Self::Empty => "EMPTY",
        }
    }
}

impl FromStr for Occupancy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOLDS_ITEM" => Ok(Self::HoldsItem),
            "EMPTY" => Ok(Self::Empty),
            other => Err(CoreError::Validation(format!("unknown occupancy '{other}'"))),
        }
    }
}

impl TryFrom<String> for Occupancy {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Open,
    Closed,
}

impl LoanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl FromStr for LoanStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            other => Err(CoreError::Validation(format!("unknown loan status '{other}'"))),
        }
    }
}

impl TryFrom<String> for LoanStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// AssociationMode
// ---------------------------------------------------------------------------

/// Mode of the single shared association record.
///
/// ```text
/// NORMAL --(web request)--> ASSOCIATION --(scan)--> SUCCESS | ERROR
///                              |
///                              +--(timeout)--> NORMAL
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssociationMode {
    Normal,
    Association,
    Success,
    Error,
}

impl AssociationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Association => "ASSOCIATION",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

impl FromStr for AssociationMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL" => Ok(Self::Normal),
            "ASSOCIATION" => Ok(Self::Association),
            "SUCCESS" => Ok(Self::Success),
            "ERROR" => Ok(Self::Error),
            other => Err(CoreError::Validation(format!(
                "unknown association mode '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for AssociationMode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, CoreError> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
