// src/sim.rs
//
// =============================================================================
// DECKHAND: DECK SIMULATOR (v 0.1 )
// =============================================================================
//
// The Stand-In.
//
// Responsibilities:
// 1. Implement the full `LabRuntime` surface in memory.
// 2. Gatekeep every call: volume bands, temperature bands, depth offsets,
//    tip state, handle validity. Reject before mutating.
// 3. Track the one real piece of state per pipette (the tip cursor) and
//    per module (setpoints, lid position).
// 4. Append one trace line per state-changing call, in call order.

use crate::core::{
    Celsius, CommandError, InstrumentModel, LabwareId, Microliters, ModuleId, ModuleKind, Mount,
    PipetteId, ProfileStep, Slot, WellAddress, MODULE_TEMP_RANGE,
};
use crate::deck::{Deck, LidPosition, WellTarget};
use crate::runtime::LabRuntime;
use crate::trace::TraceLog;

// ============================================================================
// 1. PIPETTE STATE
// ============================================================================

/// Per-instance pipette state, built at load time.
#[derive(Debug)]
struct PipetteState {
    model: InstrumentModel,
    mount: Mount,
    tip_rack: LabwareId,

    /// Next tip to pick up. `None` means the rack is exhausted and every
    /// further pickup must fail rather than proceed from a stale position.
    cursor: Option<WellAddress>,
    tip_attached: bool,
    tips_consumed: u32,
}

// ============================================================================
// 2. THE SIMULATOR
// ============================================================================

pub struct SimRuntime {
    deck: Deck,
    pipettes: Vec<PipetteState>,
    trace: TraceLog,
    commands: usize,
}

impl SimRuntime {
    pub fn new(trace: TraceLog) -> Self {
        Self {
            deck: Deck::new(),
            pipettes: Vec::new(),
            trace,
            commands: 0,
        }
    }

    /// Buffer-only simulator, for tests and programmatic inspection.
    pub fn with_silent_trace() -> Self {
        Self::new(TraceLog::silent())
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    /// Where the next pickup will come from; `None` once the rack is dry.
    pub fn tip_cursor(&self, pipette: PipetteId) -> Result<Option<WellAddress>, CommandError> {
        Ok(self.pipette(pipette)?.cursor)
    }

    // ------------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------------

    fn record(&mut self, line: String) {
        self.trace.record(line);
        self.commands += 1;
    }

    fn pipette(&self, id: PipetteId) -> Result<&PipetteState, CommandError> {
        self.pipettes
            .get(id.0)
            .ok_or(CommandError::UnknownHandle("pipette"))
    }

    fn pipette_mut(&mut self, id: PipetteId) -> Result<&mut PipetteState, CommandError> {
        self.pipettes
            .get_mut(id.0)
            .ok_or(CommandError::UnknownHandle("pipette"))
    }

    /// "Label [A1]": the labware label and well exactly as loaded, so the
    /// trace reproduces identifiers verbatim.
    fn place(&self, target: &WellTarget) -> Result<String, CommandError> {
        let labware = self.deck.labware(target.labware)?;
        Ok(format!("{} [{}]", labware.label, target.well))
    }

    fn check_volume(model: InstrumentModel, volume: Microliters) -> Result<(), CommandError> {
        let range = model.volume_range();
        if !range.contains(&volume.0) {
            return Err(CommandError::VolumeOutOfRange {
                model,
                got: volume,
                min: Microliters(*range.start()),
                max: Microliters(*range.end()),
            });
        }
        Ok(())
    }

    fn check_temperature(temperature: Celsius) -> Result<(), CommandError> {
        if !MODULE_TEMP_RANGE.contains(&temperature.0) {
            return Err(CommandError::TemperatureOutOfRange(temperature));
        }
        Ok(())
    }

    // Targets can be built by hand, so the offset is re-checked here even
    // though `WellTarget::bottom` already rejects negatives.
    fn check_depth(target: &WellTarget) -> Result<(), CommandError> {
        if let Some(mm) = target.depth_offset_mm {
            if mm < 0.0 {
                return Err(CommandError::NegativeDepthOffset(mm));
            }
        }
        Ok(())
    }

    /// Validates everything a liquid command needs: live handles, a tip on
    /// the pipette, a volume inside the instrument's band, a sane offset.
    fn check_liquid_command(
        &self,
        pipette: PipetteId,
        volume: Microliters,
        target: &WellTarget,
    ) -> Result<(), CommandError> {
        let p = self.pipette(pipette)?;
        if !p.tip_attached {
            return Err(CommandError::NoTipAttached { pipette: p.model });
        }
        Self::check_volume(p.model, volume)?;
        Self::check_depth(target)?;
        self.deck.labware(target.labware)?;
        Ok(())
    }
}

// ============================================================================
// 3. THE RUNTIME IMPLEMENTATION
// ============================================================================

impl LabRuntime for SimRuntime {
    fn home(&mut self) -> Result<(), CommandError> {
        self.record("Homing gantry".to_string());
        Ok(())
    }

    fn load_labware(
        &mut self,
        kind: &str,
        slot: Slot,
        label: &str,
    ) -> Result<LabwareId, CommandError> {
        let id = self.deck.add_labware(kind, slot, label)?;
        self.record(format!("Loaded {} in deck slot {}", kind, slot));
        Ok(id)
    }

    fn load_module(&mut self, kind: ModuleKind, slot: Slot) -> Result<ModuleId, CommandError> {
        let id = self.deck.add_module(kind, slot)?;
        self.record(format!("Loaded module {} in deck slot {}", kind, slot));
        Ok(id)
    }

    fn load_labware_on_module(
        &mut self,
        module: ModuleId,
        kind: &str,
        label: &str,
    ) -> Result<LabwareId, CommandError> {
        let id = self.deck.add_labware_on_module(module, kind, label)?;
        let module_kind = self.deck.module(module)?.kind;
        self.record(format!("Module {} loaded {}", module_kind, kind));
        Ok(id)
    }

    fn load_instrument(
        &mut self,
        model: InstrumentModel,
        mount: Mount,
        tip_rack: LabwareId,
    ) -> Result<PipetteId, CommandError> {
        self.deck.labware(tip_rack)?;
        self.pipettes.push(PipetteState {
            model,
            mount,
            tip_rack,
            // First tip of a fresh rack until the script says otherwise.
            cursor: Some(WellAddress::new('A', 1)?),
            tip_attached: false,
            tips_consumed: 0,
        });
        let id = PipetteId(self.pipettes.len() - 1);
        self.record(format!("Loaded instrument {} in mount {}", model, mount));
        Ok(id)
    }

    fn set_starting_tip(
        &mut self,
        pipette: PipetteId,
        well: WellAddress,
    ) -> Result<(), CommandError> {
        let p = self.pipette_mut(pipette)?;
        p.cursor = Some(well);
        let model = p.model;
        self.record(format!("{}: starting tip set to {}", model, well));
        Ok(())
    }

    fn pick_up_tip(&mut self, pipette: PipetteId) -> Result<(), CommandError> {
        let p = self.pipette_mut(pipette)?;
        if p.tip_attached {
            return Err(CommandError::TipAlreadyAttached { pipette: p.model });
        }
        let well = p.cursor.ok_or(CommandError::OutOfTips {
            pipette: p.model,
            mount: p.mount,
        })?;
        p.tip_attached = true;
        p.tips_consumed += 1;
        p.cursor = well.next_in_rack();
        let model = p.model;
        let rack = p.tip_rack;
        if self.pipette(pipette)?.cursor.is_none() {
            let label = self.deck.labware(rack)?.label.clone();
            log::warn!("{} took the last tip from {}", model, label);
        }
        self.record(format!("{} is picking up a tip from {}", model, well));
        Ok(())
    }

    fn drop_tip(&mut self, pipette: PipetteId) -> Result<(), CommandError> {
        let p = self.pipette_mut(pipette)?;
        if !p.tip_attached {
            return Err(CommandError::NoTipAttached { pipette: p.model });
        }
        p.tip_attached = false;
        let model = p.model;
        self.record(format!("{} is dropping a tip", model));
        Ok(())
    }

    fn aspirate(
        &mut self,
        pipette: PipetteId,
        volume: Microliters,
        target: &WellTarget,
    ) -> Result<(), CommandError> {
        self.check_liquid_command(pipette, volume, target)?;
        let place = self.place(target)?;
        self.record(format!("##### {} ---> ({})", place, volume));
        Ok(())
    }

    fn dispense(
        &mut self,
        pipette: PipetteId,
        volume: Microliters,
        target: &WellTarget,
    ) -> Result<(), CommandError> {
        self.check_liquid_command(pipette, volume, target)?;
        let place = self.place(target)?;
        self.record(format!("##### {} <--- ({})", place, volume));
        Ok(())
    }

    fn mix(
        &mut self,
        pipette: PipetteId,
        repetitions: u32,
        volume: Microliters,
        target: &WellTarget,
    ) -> Result<(), CommandError> {
        self.check_liquid_command(pipette, volume, target)?;
        let place = self.place(target)?;
        self.record(format!(
            "##### {} - mixing {} times, {}",
            place, repetitions, volume
        ));
        Ok(())
    }

    fn blow_out(&mut self, pipette: PipetteId) -> Result<(), CommandError> {
        let p = self.pipette(pipette)?;
        if !p.tip_attached {
            return Err(CommandError::NoTipAttached { pipette: p.model });
        }
        let model = p.model;
        self.record(format!("{} blow out", model));
        Ok(())
    }

    fn set_temperature(
        &mut self,
        module: ModuleId,
        temperature: Celsius,
    ) -> Result<(), CommandError> {
        Self::check_temperature(temperature)?;
        let kind = self.deck.module(module)?.kind;
        if kind != ModuleKind::TemperatureGen2 {
            return Err(CommandError::UnsupportedModuleCommand {
                module: kind,
                command: "set_temperature",
            });
        }
        self.deck.module_mut(module)?.block_target = Some(temperature);
        self.record(format!("{}: setting temperature to {}", kind, temperature));
        Ok(())
    }

    fn open_lid(&mut self, module: ModuleId) -> Result<(), CommandError> {
        let kind = self.deck.module(module)?.kind;
        if !kind.has_lid() {
            return Err(CommandError::UnsupportedModuleCommand {
                module: kind,
                command: "open_lid",
            });
        }
        self.deck.module_mut(module)?.lid = LidPosition::Open;
        self.record(format!("{}: opening lid", kind));
        Ok(())
    }

    fn close_lid(&mut self, module: ModuleId) -> Result<(), CommandError> {
        let kind = self.deck.module(module)?.kind;
        if !kind.has_lid() {
            return Err(CommandError::UnsupportedModuleCommand {
                module: kind,
                command: "close_lid",
            });
        }
        self.deck.module_mut(module)?.lid = LidPosition::Closed;
        self.record(format!("{}: closing lid", kind));
        Ok(())
    }

    fn set_lid_temperature(
        &mut self,
        module: ModuleId,
        temperature: Celsius,
    ) -> Result<(), CommandError> {
        Self::check_temperature(temperature)?;
        let kind = self.deck.module(module)?.kind;
        if !kind.has_lid() {
            return Err(CommandError::UnsupportedModuleCommand {
                module: kind,
                command: "set_lid_temperature",
            });
        }
        self.deck.module_mut(module)?.lid_target = Some(temperature);
        self.record(format!(
            "{}: setting lid temperature to {}",
            kind, temperature
        ));
        Ok(())
    }

    fn set_block_temperature(
        &mut self,
        module: ModuleId,
        temperature: Celsius,
        hold_minutes: Option<u32>,
        _block_max_volume: Option<Microliters>,
    ) -> Result<(), CommandError> {
        Self::check_temperature(temperature)?;
        let kind = self.deck.module(module)?.kind;
        if !kind.has_lid() {
            return Err(CommandError::UnsupportedModuleCommand {
                module: kind,
                command: "set_block_temperature",
            });
        }
        self.deck.module_mut(module)?.block_target = Some(temperature);
        let line = match hold_minutes {
            Some(minutes) if minutes > 0 => format!(
                "{}: setting block temperature to {} (hold {} min)",
                kind, temperature, minutes
            ),
            _ => format!("{}: setting block temperature to {}", kind, temperature),
        };
        self.record(line);
        Ok(())
    }

    fn run_profile(
        &mut self,
        module: ModuleId,
        steps: &[ProfileStep],
        _block_max_volume: Option<Microliters>,
    ) -> Result<(), CommandError> {
        if steps.is_empty() {
            return Err(CommandError::EmptyProfile);
        }
        for step in steps {
            Self::check_temperature(step.temperature)?;
        }
        let kind = self.deck.module(module)?.kind;
        if !kind.has_lid() {
            return Err(CommandError::UnsupportedModuleCommand {
                module: kind,
                command: "run_profile",
            });
        }
        // The block ends the program parked at the final step's setpoint.
        self.deck.module_mut(module)?.block_target = Some(steps[steps.len() - 1].temperature);
        let rendered = steps
            .iter()
            .map(|s| format!("{} for {} s", s.temperature, s.hold_seconds))
            .collect::<Vec<_>>()
            .join(", ");
        self.record(format!(
            "{}: running profile [{}] ({} steps)",
            kind,
            rendered,
            steps.len()
        ));
        Ok(())
    }

    fn commands_executed(&self) -> usize {
        self.commands
    }

    fn tips_consumed(&self) -> u32 {
        self.pipettes.iter().map(|p| p.tips_consumed).sum()
    }
}
