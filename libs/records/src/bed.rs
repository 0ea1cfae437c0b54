//! Bed inventory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::RecordError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BedStatus {
    #[default]
    Available,
    Occupied,
    Maintenance,
}

impl BedStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BedStatus::Available => "available",
            BedStatus::Occupied => "occupied",
            BedStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for BedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BedStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(BedStatus::Available),
            "occupied" => Ok(BedStatus::Occupied),
            "maintenance" => Ok(BedStatus::Maintenance),
            other => Err(RecordError::UnknownBedStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bed {
    pub bed_no: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_no: Option<i32>,
    pub status: BedStatus,
}

/// Payload for adding a bed. Without `bedNo` the store assigns the next number.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBed {
    #[serde(default)]
    #[validate(range(min = 1))]
    pub bed_no: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub room_no: Option<i32>,
    #[serde(default)]
    pub status: BedStatus,
}

/// Number for a bed added without one: one past the highest in use.
///
/// `None` once the highest number leaves no room above it.
pub fn next_bed_number(highest: Option<i32>) -> Option<i32> {
    highest.map_or(Some(1), |n| n.checked_add(1))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedStatusChange {
    pub status: BedStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BedAssignment {
    #[validate(range(min = 1))]
    pub bed_no: i32,
}
