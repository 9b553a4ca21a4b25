// src/protocol.rs
//
// =============================================================================
// DECKHAND: RESTRICTION DIGEST PROTOCOL (v 0.1 )
// =============================================================================
//
// The Script.
//
// A fixed, linear pipeline against the `LabRuntime` port: load labware and
// modules, chill the reagents, assemble the digest in one reaction well,
// run the thermal program, park cold. No conditionals, no loops over
// variable-length input, no retries.
//
// Quantities, wells, and setpoints come from `ProtocolConfig`; the defaults
// reproduce the reference bench procedure and a YAML file can override them.

use crate::core::{
    Celsius, CommandError, InstrumentModel, Microliters, ModuleKind, Mount, PipetteId,
    ProfileStep, ProtocolMetadata, Slot, WellAddress,
};
use crate::deck::WellTarget;
use crate::runtime::LabRuntime;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// 1. METADATA
// ============================================================================

pub fn metadata() -> ProtocolMetadata {
    ProtocolMetadata {
        protocol_name: "Restriction Digest".to_string(),
        author: "Deckhand Team <protocols@deckhand.dev>".to_string(),
        source: "Protocol Library".to_string(),
        api_level: "2.9".to_string(),
    }
}

// ============================================================================
// 2. CONFIGURATION (The Blueprint)
// ============================================================================

/// Everything tunable about the digest. `Default` is the reference
/// procedure; any field can be overridden from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    // Tip bookkeeping
    pub starting_tip_p20: WellAddress,
    pub starting_tip_p300: WellAddress,

    // Source and destination wells
    pub water_well: WellAddress,
    pub buffer_well: WellAddress,
    pub template_well: WellAddress,
    pub enzyme_well: WellAddress,
    pub reaction_well: WellAddress,

    // Reagent quantities (µL)
    pub water_volume: Microliters,
    pub buffer_volume: Microliters,
    pub template_volume: Microliters,
    pub enzyme_volume: Microliters,

    // Mixing after each addition
    pub mix_repetitions: u32,
    pub p20_mix_volume: Microliters,
    pub p300_mix_volume: Microliters,

    /// Tip height above the well bottom when aspirating from sources (mm).
    pub aspirate_clearance_mm: f64,

    // Thermal program
    pub cold_temp: Celsius,
    pub lid_temp: Celsius,
    pub digest_temp: Celsius,
    pub digest_seconds: u32,
    pub inactivation_temp: Celsius,
    pub inactivation_seconds: u32,
    pub block_max_volume: Microliters,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            starting_tip_p20: WellAddress::new('A', 1).unwrap(),
            starting_tip_p300: WellAddress::new('A', 1).unwrap(),

            water_well: WellAddress::new('A', 1).unwrap(),
            buffer_well: WellAddress::new('A', 1).unwrap(),
            template_well: WellAddress::new('B', 1).unwrap(),
            enzyme_well: WellAddress::new('C', 1).unwrap(),
            reaction_well: WellAddress::new('A', 1).unwrap(),

            // 50 µL digest: 38 water + 5 buffer + 5 template + 2 enzyme
            water_volume: Microliters(38.0),
            buffer_volume: Microliters(5.0),
            template_volume: Microliters(5.0),
            enzyme_volume: Microliters(2.0),

            mix_repetitions: 3,
            p20_mix_volume: Microliters(10.0),
            p300_mix_volume: Microliters(25.0),

            aspirate_clearance_mm: 1.0,

            cold_temp: Celsius(4),
            lid_temp: Celsius(102),
            digest_temp: Celsius(37),
            digest_seconds: 1800,
            inactivation_temp: Celsius(80),
            inactivation_seconds: 1200,
            block_max_volume: Microliters(50.0),
        }
    }
}

impl ProtocolConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading protocol config {}", path.display()))?;
        let cfg: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing protocol config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("parsing protocol config")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("serializing protocol config")
    }

    /// The Gatekeeper: cross-checks quantities against the instruments that
    /// will move them, before a single command reaches the deck.
    pub fn validate(&self) -> Result<(), CommandError> {
        let p20 = InstrumentModel::P20SingleGen2.volume_range();
        let p300 = InstrumentModel::P300Single.volume_range();

        for &volume in &[self.buffer_volume, self.template_volume, self.enzyme_volume] {
            if !p20.contains(&volume.0) {
                return Err(CommandError::VolumeOutOfRange {
                    model: InstrumentModel::P20SingleGen2,
                    got: volume,
                    min: Microliters(*p20.start()),
                    max: Microliters(*p20.end()),
                });
            }
        }
        if !p20.contains(&self.p20_mix_volume.0) {
            return Err(CommandError::VolumeOutOfRange {
                model: InstrumentModel::P20SingleGen2,
                got: self.p20_mix_volume,
                min: Microliters(*p20.start()),
                max: Microliters(*p20.end()),
            });
        }
        for &volume in &[self.water_volume, self.p300_mix_volume] {
            if !p300.contains(&volume.0) {
                return Err(CommandError::VolumeOutOfRange {
                    model: InstrumentModel::P300Single,
                    got: volume,
                    min: Microliters(*p300.start()),
                    max: Microliters(*p300.end()),
                });
            }
        }

        if self.aspirate_clearance_mm < 0.0 {
            return Err(CommandError::NegativeDepthOffset(self.aspirate_clearance_mm));
        }

        Ok(())
    }
}

// ============================================================================
// 3. THE SEQUENCE
// ============================================================================

/// Runs the digest end to end against any runtime.
pub fn run_restriction_digest(api: &mut dyn LabRuntime, cfg: &ProtocolConfig) -> Result<()> {
    cfg.validate()?;

    api.home()?;

    // --- Load labware ---
    let tips_20 = api.load_labware(
        "opentrons_96_tiprack_20ul",
        Slot::new(3)?,
        "Opentrons 20uL Tips",
    )?;
    let tips_300 = api.load_labware(
        "opentrons_96_tiprack_300ul",
        Slot::new(6)?,
        "Opentrons 300uL Tips",
    )?;
    let reservoir = api.load_labware(
        "usascientific_12_reservoir_22ml",
        Slot::new(1)?,
        "Water Source",
    )?;

    // --- Load modules and their labware ---
    let temp_module = api.load_module(ModuleKind::TemperatureGen2, Slot::new(4)?)?;
    let thermocycler = api.load_module(ModuleKind::Thermocycler, Slot::new(7)?)?;

    let cold_tray = api.load_labware_on_module(
        temp_module,
        "opentrons_24_aluminumblock_generic_2ml_screwcap",
        "Cold Tray",
    )?;
    let reaction_plate = api.load_labware_on_module(
        thermocycler,
        "nest_96_wellplate_100ul_pcr_full_skirt",
        "Reaction Plate",
    )?;

    // --- Configure modules ---
    // The cold tray is the ice block: reagents and enzyme sit at 4 C until
    // mixed. The lid runs hotter than the block so nothing condenses on it.
    log::info!("Configuring thermal modules");
    api.set_temperature(temp_module, cfg.cold_temp)?;
    api.open_lid(thermocycler)?;
    api.set_lid_temperature(thermocycler, cfg.lid_temp)?;
    api.set_block_temperature(thermocycler, cfg.cold_temp, None, Some(cfg.block_max_volume))?;

    // --- Load pipettes ---
    let p20 = api.load_instrument(InstrumentModel::P20SingleGen2, Mount::Left, tips_20)?;
    let p300 = api.load_instrument(InstrumentModel::P300Single, Mount::Right, tips_300)?;
    api.set_starting_tip(p20, cfg.starting_tip_p20)?;
    api.set_starting_tip(p300, cfg.starting_tip_p300)?;

    // --- Dry tip check on both mounts ---
    api.pick_up_tip(p20)?;
    api.drop_tip(p20)?;
    api.pick_up_tip(p300)?;
    api.drop_tip(p300)?;

    // --- Assemble the reaction ---
    log::info!("Assembling digest in reaction well {}", cfg.reaction_well);
    let reaction = WellTarget::at(reaction_plate, cfg.reaction_well);

    transfer(
        api,
        p300,
        cfg.water_volume,
        WellTarget::at(reservoir, cfg.water_well).bottom(cfg.aspirate_clearance_mm)?,
        reaction,
        cfg.mix_repetitions,
        cfg.p300_mix_volume,
    )?;
    transfer(
        api,
        p20,
        cfg.buffer_volume,
        WellTarget::at(cold_tray, cfg.buffer_well).bottom(cfg.aspirate_clearance_mm)?,
        reaction,
        cfg.mix_repetitions,
        cfg.p20_mix_volume,
    )?;
    transfer(
        api,
        p20,
        cfg.template_volume,
        WellTarget::at(cold_tray, cfg.template_well).bottom(cfg.aspirate_clearance_mm)?,
        reaction,
        cfg.mix_repetitions,
        cfg.p20_mix_volume,
    )?;
    transfer(
        api,
        p20,
        cfg.enzyme_volume,
        WellTarget::at(cold_tray, cfg.enzyme_well).bottom(cfg.aspirate_clearance_mm)?,
        reaction,
        cfg.mix_repetitions,
        cfg.p20_mix_volume,
    )?;

    // --- Thermal program: digest, heat-kill, park cold ---
    log::info!(
        "Running digest at {} for {} s, inactivation at {} for {} s",
        cfg.digest_temp,
        cfg.digest_seconds,
        cfg.inactivation_temp,
        cfg.inactivation_seconds
    );
    api.close_lid(thermocycler)?;
    let program = [
        ProfileStep {
            temperature: cfg.digest_temp,
            hold_seconds: cfg.digest_seconds,
        },
        ProfileStep {
            temperature: cfg.inactivation_temp,
            hold_seconds: cfg.inactivation_seconds,
        },
    ];
    api.run_profile(thermocycler, &program, Some(cfg.block_max_volume))?;
    api.set_block_temperature(thermocycler, cfg.cold_temp, None, Some(cfg.block_max_volume))?;

    log::info!("Protocol sequence complete");
    Ok(())
}

/// One addition: fresh tip, draw from the source, deliver to the
/// destination, mix it in, blow out, bin the tip.
fn transfer(
    api: &mut dyn LabRuntime,
    pipette: PipetteId,
    volume: Microliters,
    source: WellTarget,
    destination: WellTarget,
    mix_repetitions: u32,
    mix_volume: Microliters,
) -> Result<(), CommandError> {
    api.pick_up_tip(pipette)?;
    api.aspirate(pipette, volume, &source)?;
    api.dispense(pipette, volume, &destination)?;
    api.mix(pipette, mix_repetitions, mix_volume, &destination)?;
    api.blow_out(pipette)?;
    api.drop_tip(pipette)?;
    Ok(())
}
