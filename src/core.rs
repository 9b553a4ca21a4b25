// src/core.rs
//
// =============================================================================
// DECKHAND: CORE SCHEMA AUTHORITY (v 0.1 )
// =============================================================================
//
// The "Esperanto" of the deck.
// This file defines the strict data contracts shared by the protocol script,
// the simulator, and the CLI.
//
// Design Principles:
// 1. Newtype Pattern: Prevent unit errors (uL vs mL, C vs F).
// 2. Closed Variants: Instruments and modules are typed enums carrying their
//    capability data, never name strings compared by substring.
// 3. Per-Instance State: Everything mutable lives on structs built at load
//    time, not on shared defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// 1. TYPE-SAFE UNITS (The "Newtype" Pattern)
// ============================================================================

/// Liquid volume in microliters (µL).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Microliters(pub f64);

impl fmt::Display for Microliters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} uL", self.0)
    }
}

/// Temperature in whole degrees Celsius.
///
/// Thermal hardware only accepts integer setpoints, so this is an `i32`
/// rather than a float.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Celsius(pub i32);

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} C", self.0)
    }
}

/// Setpoint band accepted by every thermal device on the deck.
pub const MODULE_TEMP_RANGE: RangeInclusive<i32> = 4..=110;

// ============================================================================
// 2. DECK GEOMETRY
// ============================================================================

pub const ROW_FIRST: char = 'A';
pub const ROW_LAST: char = 'H';
pub const COL_FIRST: u8 = 1;
pub const COL_LAST: u8 = 12;

/// A deck position on the OT-2 grid (1-11).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Slot(u8);

impl Slot {
    pub fn new(number: u8) -> Result<Self, CommandError> {
        if !(1..=11).contains(&number) {
            return Err(CommandError::SlotOutOfRange(number));
        }
        Ok(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A well coordinate: row letter A-H plus column number 1-12.
///
/// Parses from the two-character vendor form ("A1", "H12") and serializes
/// back to it, so config files read the way a bench scientist writes wells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WellAddress {
    row: char,
    col: u8,
}

impl WellAddress {
    pub fn new(row: char, col: u8) -> Result<Self, CommandError> {
        let row = row.to_ascii_uppercase();
        if !(ROW_FIRST..=ROW_LAST).contains(&row) || !(COL_FIRST..=COL_LAST).contains(&col) {
            return Err(CommandError::InvalidWellAddress(format!("{}{}", row, col)));
        }
        Ok(Self { row, col })
    }

    pub fn row(self) -> char {
        self.row
    }

    pub fn col(self) -> u8 {
        self.col
    }

    /// Row-major successor within a 96-position rack.
    ///
    /// A1 -> B1 -> ... -> H1 -> A2, and so on. Returns `None` past H12,
    /// which callers must treat as rack exhaustion.
    pub fn next_in_rack(self) -> Option<Self> {
        if self.row < ROW_LAST {
            Some(Self {
                row: (self.row as u8 + 1) as char,
                col: self.col,
            })
        } else if self.col < COL_LAST {
            Some(Self {
                row: ROW_FIRST,
                col: self.col + 1,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for WellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.col)
    }
}

impl FromStr for WellAddress {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let row = chars
            .next()
            .ok_or_else(|| CommandError::InvalidWellAddress(s.to_string()))?;
        let col: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| CommandError::InvalidWellAddress(s.to_string()))?;
        Self::new(row, col).map_err(|_| CommandError::InvalidWellAddress(s.to_string()))
    }
}

impl Serialize for WellAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WellAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// 3. INSTRUMENTS & MODULES (Closed Variants + Capability Data)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mount {
    Left,
    Right,
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mount::Left => write!(f, "left"),
            Mount::Right => write!(f, "right"),
        }
    }
}

/// The pipettes this lab stocks. The supported volume band is capability
/// data on the variant, so validation never has to parse a model name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstrumentModel {
    P20SingleGen2,
    P300Single,
}

impl InstrumentModel {
    /// Vendor catalog identifier, passed through to load calls verbatim.
    pub fn api_name(self) -> &'static str {
        match self {
            InstrumentModel::P20SingleGen2 => "p20_single_gen2",
            InstrumentModel::P300Single => "p300_single",
        }
    }

    /// Inclusive volume band (µL) the instrument can aspirate or dispense.
    pub fn volume_range(self) -> RangeInclusive<f64> {
        match self {
            InstrumentModel::P20SingleGen2 => 1.0..=20.0,
            InstrumentModel::P300Single => 20.0..=300.0,
        }
    }
}

impl fmt::Display for InstrumentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

/// The actuated deck accessories this lab stocks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModuleKind {
    TemperatureGen2,
    Thermocycler,
}

impl ModuleKind {
    pub fn api_name(self) -> &'static str {
        match self {
            ModuleKind::TemperatureGen2 => "temperature module gen2",
            ModuleKind::Thermocycler => "thermocycler",
        }
    }

    /// Only the thermocycler carries a heated lid and block program surface;
    /// the plain temperature module exposes a single setpoint.
    pub fn has_lid(self) -> bool {
        matches!(self, ModuleKind::Thermocycler)
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

// ============================================================================
// 4. HANDLES (Issued by load calls, valid for one run)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LabwareId(pub(crate) usize);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ModuleId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipetteId(pub(crate) usize);

// ============================================================================
// 5. THERMAL PROFILES
// ============================================================================

/// One step of a thermocycler block program.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileStep {
    pub temperature: Celsius,
    pub hold_seconds: u32,
}

// ============================================================================
// 6. COMMAND ERRORS (Fail-Fast Preconditions)
// ============================================================================

/// Every way a deck command can be rejected.
///
/// These are design-time guards: a statically correct protocol never sees
/// them, and nothing downstream catches or retries one.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("deck slot must be 1-11, got {0}")]
    SlotOutOfRange(u8),

    #[error("deck slot {0} is already occupied")]
    SlotOccupied(Slot),

    #[error("invalid well address {0:?}: expected row A-H and column 1-12")]
    InvalidWellAddress(String),

    #[error("well depth offset must be non-negative, got {0} mm")]
    NegativeDepthOffset(f64),

    #[error("{model} supports {min}-{max}, got {got}")]
    VolumeOutOfRange {
        model: InstrumentModel,
        got: Microliters,
        min: Microliters,
        max: Microliters,
    },

    #[error("temperature {0} is outside the supported 4 C - 110 C band")]
    TemperatureOutOfRange(Celsius),

    #[error("{pipette} on the {mount} mount is out of tips")]
    OutOfTips {
        pipette: InstrumentModel,
        mount: Mount,
    },

    #[error("{pipette} has no tip attached")]
    NoTipAttached { pipette: InstrumentModel },

    #[error("{pipette} already holds a tip")]
    TipAlreadyAttached { pipette: InstrumentModel },

    #[error("module {module} does not support {command}")]
    UnsupportedModuleCommand {
        module: ModuleKind,
        command: &'static str,
    },

    #[error("module {0} already hosts labware")]
    ModuleOccupied(ModuleKind),

    #[error("unknown {0} handle: not issued by this runtime")]
    UnknownHandle(&'static str),

    #[error("thermal profile must contain at least one step")]
    EmptyProfile,
}

// ============================================================================
// 7. METADATA & RUN REPORT
// ============================================================================

/// Header block identifying the protocol, mirroring the vendor's
/// protocol-library metadata fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolMetadata {
    pub protocol_name: String,
    pub author: String,
    pub source: String,
    pub api_level: String,
}

/// Post-run provenance summary emitted by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub execution_host: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub commands_executed: usize,
    pub tips_consumed: u32,
}
