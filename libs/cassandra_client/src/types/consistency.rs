use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Replica acknowledgement level for a read or write
///
/// Discriminants match the wire values of the Thrift interface.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[repr(i32)]
pub enum ConsistencyLevel {
    One = 1,
    #[default]
    Quorum = 2,
    LocalQuorum = 3,
    EachQuorum = 4,
    All = 5,
    Any = 6,
}

impl ConsistencyLevel {
    /// Wire value of this level
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for ConsistencyLevel {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ConsistencyLevel::One),
            2 => Ok(ConsistencyLevel::Quorum),
            3 => Ok(ConsistencyLevel::LocalQuorum),
            4 => Ok(ConsistencyLevel::EachQuorum),
            5 => Ok(ConsistencyLevel::All),
            6 => Ok(ConsistencyLevel::Any),
            other => Err(other),
        }
    }
}

/// Default read/write levels carried by a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsistencyLevels {
    pub read: ConsistencyLevel,
    pub write: ConsistencyLevel,
}

impl ConsistencyLevels {
    pub fn new(read: ConsistencyLevel, write: ConsistencyLevel) -> Self {
        Self { read, write }
    }
}

/// Replacement for the stored defaults
///
/// A field left as `None` resets to `QUORUM` rather than keeping the
/// previous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsistencyUpdate {
    pub read: Option<ConsistencyLevel>,
    pub write: Option<ConsistencyLevel>,
}

impl ConsistencyUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(mut self, level: ConsistencyLevel) -> Self {
        self.read = Some(level);
        self
    }

    pub fn write(mut self, level: ConsistencyLevel) -> Self {
        self.write = Some(level);
        self
    }

    pub(crate) fn apply(self) -> ConsistencyLevels {
        ConsistencyLevels {
            read: self.read.unwrap_or_default(),
            write: self.write.unwrap_or_default(),
        }
    }
}

impl From<ConsistencyLevels> for ConsistencyUpdate {
    fn from(levels: ConsistencyLevels) -> Self {
        Self {
            read: Some(levels.read),
            write: Some(levels.write),
        }
    }
}
