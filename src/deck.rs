// src/deck.rs
//
// =============================================================================
// DECKHAND: DECK INVENTORY (v 0.1 )
// =============================================================================
//
// The Inventory.
//
// Responsibilities:
// 1. Register labware and modules against deck slots (occupancy checks).
// 2. Hold per-instance module state (setpoints, lid position).
// 3. Resolve handles back to the physical items they name.

use crate::core::{Celsius, CommandError, LabwareId, ModuleId, ModuleKind, Slot, WellAddress};
use serde::{Deserialize, Serialize};

// ============================================================================
// 1. PHYSICAL ITEMS
// ============================================================================

/// A plate, rack, or reservoir occupying one deck position.
///
/// The vendor type name is free-form catalog data and passes through
/// untouched; only the slot and label matter to the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Labware {
    pub kind: String,
    pub slot: Slot,
    pub label: String,
    pub on_module: Option<ModuleId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LidPosition {
    Open,
    Closed,
}

/// Mutable per-instance module state, initialized at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleState {
    pub kind: ModuleKind,
    pub slot: Slot,
    pub block_target: Option<Celsius>,
    pub lid_target: Option<Celsius>,
    pub lid: LidPosition,
    pub hosted_labware: Option<LabwareId>,
}

impl ModuleState {
    fn new(kind: ModuleKind, slot: Slot) -> Self {
        Self {
            kind,
            slot,
            block_target: None,
            lid_target: None,
            lid: LidPosition::Closed,
            hosted_labware: None,
        }
    }
}

// ============================================================================
// 2. WELL TARGETS
// ============================================================================

/// A well on a loaded labware item, optionally with a depth offset
/// (mm above the well bottom) for the pipette tip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WellTarget {
    pub labware: LabwareId,
    pub well: WellAddress,
    pub depth_offset_mm: Option<f64>,
}

impl WellTarget {
    pub fn at(labware: LabwareId, well: WellAddress) -> Self {
        Self {
            labware,
            well,
            depth_offset_mm: None,
        }
    }

    /// Position the tip `mm` above the well bottom. Zero is the bottom
    /// itself and is accepted; negative offsets are rejected.
    pub fn bottom(mut self, mm: f64) -> Result<Self, CommandError> {
        if mm < 0.0 {
            return Err(CommandError::NegativeDepthOffset(mm));
        }
        self.depth_offset_mm = Some(mm);
        Ok(self)
    }
}

// ============================================================================
// 3. THE DECK (Registry + Occupancy)
// ============================================================================

#[derive(Debug, Default)]
pub struct Deck {
    labware: Vec<Labware>,
    modules: Vec<ModuleState>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers labware placed directly on the deck.
    pub fn add_labware(
        &mut self,
        kind: &str,
        slot: Slot,
        label: &str,
    ) -> Result<LabwareId, CommandError> {
        if !self.slot_is_free(slot) {
            return Err(CommandError::SlotOccupied(slot));
        }
        self.labware.push(Labware {
            kind: kind.to_string(),
            slot,
            label: label.to_string(),
            on_module: None,
        });
        Ok(LabwareId(self.labware.len() - 1))
    }

    pub fn add_module(&mut self, kind: ModuleKind, slot: Slot) -> Result<ModuleId, CommandError> {
        if !self.slot_is_free(slot) {
            return Err(CommandError::SlotOccupied(slot));
        }
        self.modules.push(ModuleState::new(kind, slot));
        Ok(ModuleId(self.modules.len() - 1))
    }

    /// Registers labware seated on a module. The module's slot is already
    /// occupied by the module itself, so occupancy is tracked on the module:
    /// one hosted item, no more.
    pub fn add_labware_on_module(
        &mut self,
        module: ModuleId,
        kind: &str,
        label: &str,
    ) -> Result<LabwareId, CommandError> {
        let state = self.module(module)?;
        if state.hosted_labware.is_some() {
            return Err(CommandError::ModuleOccupied(state.kind));
        }
        let slot = state.slot;
        self.labware.push(Labware {
            kind: kind.to_string(),
            slot,
            label: label.to_string(),
            on_module: Some(module),
        });
        let id = LabwareId(self.labware.len() - 1);
        self.module_mut(module)?.hosted_labware = Some(id);
        Ok(id)
    }

    pub fn labware(&self, id: LabwareId) -> Result<&Labware, CommandError> {
        self.labware
            .get(id.0)
            .ok_or(CommandError::UnknownHandle("labware"))
    }

    pub fn module(&self, id: ModuleId) -> Result<&ModuleState, CommandError> {
        self.modules
            .get(id.0)
            .ok_or(CommandError::UnknownHandle("module"))
    }

    pub fn module_mut(&mut self, id: ModuleId) -> Result<&mut ModuleState, CommandError> {
        self.modules
            .get_mut(id.0)
            .ok_or(CommandError::UnknownHandle("module"))
    }

    fn slot_is_free(&self, slot: Slot) -> bool {
        self.labware
            .iter()
            .all(|lw| lw.slot != slot || lw.on_module.is_some())
            && self.modules.iter().all(|m| m.slot != slot)
    }
}
