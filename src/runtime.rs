// src/runtime.rs
//
// =============================================================================
// DECKHAND: RUNTIME PORT & FACTORY (v 0.1 )
// =============================================================================
//
// The Hexagonal Port.
//
// Responsibilities:
// 1. Define the `LabRuntime` trait: the call surface a protocol script is
//    written against, identical for the simulator and a vendor-backed robot.
// 2. Dispatch `RuntimeKind` variants to concrete implementations.
//
// Every call blocks until the (simulated or real) device acknowledges the
// action; there is no async surface because the run is strictly sequential.

use crate::core::{
    Celsius, CommandError, InstrumentModel, LabwareId, Microliters, ModuleId, ModuleKind, Mount,
    PipetteId, ProfileStep, Slot, WellAddress,
};
use crate::deck::WellTarget;
use crate::sim::SimRuntime;
use crate::trace::TraceLog;
use anyhow::{anyhow, Result};
use std::time::Duration;

// ============================================================================
// 1. THE RUNTIME TRAIT (The Contract)
// ============================================================================

pub trait LabRuntime {
    /// Returns the gantry to its reference position. Always the first call.
    fn home(&mut self) -> Result<(), CommandError>;

    // --- Load-time: executed once at protocol start ---

    fn load_labware(
        &mut self,
        kind: &str,
        slot: Slot,
        label: &str,
    ) -> Result<LabwareId, CommandError>;

    fn load_module(&mut self, kind: ModuleKind, slot: Slot) -> Result<ModuleId, CommandError>;

    fn load_labware_on_module(
        &mut self,
        module: ModuleId,
        kind: &str,
        label: &str,
    ) -> Result<LabwareId, CommandError>;

    fn load_instrument(
        &mut self,
        model: InstrumentModel,
        mount: Mount,
        tip_rack: LabwareId,
    ) -> Result<PipetteId, CommandError>;

    // --- Tip handling ---

    fn set_starting_tip(
        &mut self,
        pipette: PipetteId,
        well: WellAddress,
    ) -> Result<(), CommandError>;

    fn pick_up_tip(&mut self, pipette: PipetteId) -> Result<(), CommandError>;

    fn drop_tip(&mut self, pipette: PipetteId) -> Result<(), CommandError>;

    // --- Liquid handling ---

    fn aspirate(
        &mut self,
        pipette: PipetteId,
        volume: Microliters,
        target: &WellTarget,
    ) -> Result<(), CommandError>;

    fn dispense(
        &mut self,
        pipette: PipetteId,
        volume: Microliters,
        target: &WellTarget,
    ) -> Result<(), CommandError>;

    fn mix(
        &mut self,
        pipette: PipetteId,
        repetitions: u32,
        volume: Microliters,
        target: &WellTarget,
    ) -> Result<(), CommandError>;

    fn blow_out(&mut self, pipette: PipetteId) -> Result<(), CommandError>;

    // --- Thermal control ---

    fn set_temperature(&mut self, module: ModuleId, temperature: Celsius)
        -> Result<(), CommandError>;

    fn open_lid(&mut self, module: ModuleId) -> Result<(), CommandError>;

    fn close_lid(&mut self, module: ModuleId) -> Result<(), CommandError>;

    fn set_lid_temperature(
        &mut self,
        module: ModuleId,
        temperature: Celsius,
    ) -> Result<(), CommandError>;

    fn set_block_temperature(
        &mut self,
        module: ModuleId,
        temperature: Celsius,
        hold_minutes: Option<u32>,
        block_max_volume: Option<Microliters>,
    ) -> Result<(), CommandError>;

    fn run_profile(
        &mut self,
        module: ModuleId,
        steps: &[ProfileStep],
        block_max_volume: Option<Microliters>,
    ) -> Result<(), CommandError>;

    // --- Run accounting (for the post-run report) ---

    fn commands_executed(&self) -> usize;

    fn tips_consumed(&self) -> u32;
}

// ============================================================================
// 2. THE DISPATCHER (The Factory)
// ============================================================================

/// Which concrete runtime backs the protocol run.
#[derive(Debug, Clone)]
pub enum RuntimeKind {
    /// In-memory simulator: validates arguments, tracks state, emits the
    /// trace. `echo_delay` rate-limits the stdout echo; `quiet` suppresses
    /// the echo entirely (the buffer still fills).
    Simulated {
        echo_delay: Option<Duration>,
        quiet: bool,
    },

    /// The physical robot, reached through the vendor control stack.
    Robot { host: String },
}

pub struct RuntimeFactory;

impl RuntimeFactory {
    /// Returns a boxed runtime for the requested kind.
    pub fn get(kind: &RuntimeKind) -> Result<Box<dyn LabRuntime>> {
        match kind {
            RuntimeKind::Simulated { echo_delay, quiet } => {
                let trace = if *quiet {
                    TraceLog::silent()
                } else {
                    TraceLog::stdout(*echo_delay)
                };
                Ok(Box::new(SimRuntime::new(trace)))
            }

            // The robot driver is vendor-owned and not part of this crate;
            // selecting it only makes sense in a build that links it.
            RuntimeKind::Robot { host } => Err(anyhow!(
                "robot backend ({}) requires the vendor control stack, which is not linked into this build",
                host
            )),
        }
    }
}
