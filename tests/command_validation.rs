use deckhand::{
    Celsius, CommandError, InstrumentModel, LabRuntime, LabwareId, Microliters, ModuleKind, Mount,
    PipetteId, SimRuntime, Slot, WellAddress, WellTarget,
};

fn well(s: &str) -> WellAddress {
    s.parse().unwrap()
}

/// Simulator with a reservoir and one pipette of the given model, tip
/// already attached so liquid commands are reachable.
fn armed_sim(model: InstrumentModel) -> (SimRuntime, PipetteId, LabwareId) {
    let mut sim = SimRuntime::with_silent_trace();
    let rack = sim
        .load_labware("opentrons_96_tiprack_300ul", Slot::new(6).unwrap(), "Tips")
        .unwrap();
    let reservoir = sim
        .load_labware(
            "usascientific_12_reservoir_22ml",
            Slot::new(1).unwrap(),
            "Water Source",
        )
        .unwrap();
    let pipette = sim.load_instrument(model, Mount::Right, rack).unwrap();
    sim.pick_up_tip(pipette).unwrap();
    (sim, pipette, reservoir)
}

#[test]
fn test_volume_band_rejects_out_of_range() {
    let (mut sim, p300, reservoir) = armed_sim(InstrumentModel::P300Single);
    let target = WellTarget::at(reservoir, well("A1"));

    for bad in [0.5, 10.0, 300.1, 1000.0] {
        let err = sim.aspirate(p300, Microliters(bad), &target).unwrap_err();
        assert!(
            matches!(err, CommandError::VolumeOutOfRange { .. }),
            "{} uL should be rejected",
            bad
        );
        assert!(sim.dispense(p300, Microliters(bad), &target).is_err());
        assert!(sim.mix(p300, 3, Microliters(bad), &target).is_err());
    }
}

#[test]
fn test_volume_band_boundaries_pass() {
    let (mut sim, p300, reservoir) = armed_sim(InstrumentModel::P300Single);
    let target = WellTarget::at(reservoir, well("A1"));
    sim.aspirate(p300, Microliters(20.0), &target).unwrap();
    sim.dispense(p300, Microliters(20.0), &target).unwrap();
    sim.aspirate(p300, Microliters(300.0), &target).unwrap();

    let (mut sim, p20, reservoir) = armed_sim(InstrumentModel::P20SingleGen2);
    let target = WellTarget::at(reservoir, well("A1"));
    sim.aspirate(p20, Microliters(1.0), &target).unwrap();
    sim.aspirate(p20, Microliters(20.0), &target).unwrap();
    assert!(sim.aspirate(p20, Microliters(20.5), &target).is_err());
}

#[test]
fn test_temperature_band() {
    let mut sim = SimRuntime::with_silent_trace();
    let temp_module = sim
        .load_module(ModuleKind::TemperatureGen2, Slot::new(4).unwrap())
        .unwrap();
    let thermocycler = sim
        .load_module(ModuleKind::Thermocycler, Slot::new(7).unwrap())
        .unwrap();

    for bad in [-20, 0, 3, 111, 200] {
        assert_eq!(
            sim.set_temperature(temp_module, Celsius(bad)).unwrap_err(),
            CommandError::TemperatureOutOfRange(Celsius(bad))
        );
        assert!(sim
            .set_lid_temperature(thermocycler, Celsius(bad))
            .is_err());
        assert!(sim
            .set_block_temperature(thermocycler, Celsius(bad), None, None)
            .is_err());
    }

    // Band edges are valid setpoints.
    sim.set_temperature(temp_module, Celsius(4)).unwrap();
    sim.set_temperature(temp_module, Celsius(110)).unwrap();
    sim.set_lid_temperature(thermocycler, Celsius(110)).unwrap();
    sim.set_block_temperature(thermocycler, Celsius(4), None, None)
        .unwrap();
}

#[test]
fn test_module_capability_dispatch() {
    let mut sim = SimRuntime::with_silent_trace();
    let temp_module = sim
        .load_module(ModuleKind::TemperatureGen2, Slot::new(4).unwrap())
        .unwrap();
    let thermocycler = sim
        .load_module(ModuleKind::Thermocycler, Slot::new(7).unwrap())
        .unwrap();

    // No lid on the plain temperature module.
    assert_eq!(
        sim.open_lid(temp_module).unwrap_err(),
        CommandError::UnsupportedModuleCommand {
            module: ModuleKind::TemperatureGen2,
            command: "open_lid",
        }
    );
    assert!(sim.close_lid(temp_module).is_err());
    assert!(sim.set_lid_temperature(temp_module, Celsius(102)).is_err());
    assert!(sim
        .set_block_temperature(temp_module, Celsius(4), None, None)
        .is_err());

    // And no bare setpoint on the thermocycler.
    assert_eq!(
        sim.set_temperature(thermocycler, Celsius(4)).unwrap_err(),
        CommandError::UnsupportedModuleCommand {
            module: ModuleKind::Thermocycler,
            command: "set_temperature",
        }
    );
}

#[test]
fn test_depth_offset_zero_accepted_negative_rejected() {
    let (mut sim, p300, reservoir) = armed_sim(InstrumentModel::P300Single);

    let at_bottom = WellTarget::at(reservoir, well("A1")).bottom(0.0).unwrap();
    sim.aspirate(p300, Microliters(50.0), &at_bottom).unwrap();

    assert_eq!(
        WellTarget::at(reservoir, well("A1")).bottom(-0.1).unwrap_err(),
        CommandError::NegativeDepthOffset(-0.1)
    );

    // A hand-built target cannot sneak a negative offset past the runtime.
    let mut hacked = WellTarget::at(reservoir, well("A1"));
    hacked.depth_offset_mm = Some(-2.0);
    assert_eq!(
        sim.aspirate(p300, Microliters(50.0), &hacked).unwrap_err(),
        CommandError::NegativeDepthOffset(-2.0)
    );
}

#[test]
fn test_tip_state_guards() {
    let mut sim = SimRuntime::with_silent_trace();
    let rack = sim
        .load_labware("opentrons_96_tiprack_20ul", Slot::new(3).unwrap(), "Tips")
        .unwrap();
    let reservoir = sim
        .load_labware(
            "usascientific_12_reservoir_22ml",
            Slot::new(1).unwrap(),
            "Water Source",
        )
        .unwrap();
    let p20 = sim
        .load_instrument(InstrumentModel::P20SingleGen2, Mount::Left, rack)
        .unwrap();
    let target = WellTarget::at(reservoir, well("A1"));

    // Nothing liquid without a tip.
    assert_eq!(
        sim.aspirate(p20, Microliters(5.0), &target).unwrap_err(),
        CommandError::NoTipAttached {
            pipette: InstrumentModel::P20SingleGen2
        }
    );
    assert!(sim.blow_out(p20).is_err());
    assert!(sim.drop_tip(p20).is_err());

    sim.pick_up_tip(p20).unwrap();
    assert_eq!(
        sim.pick_up_tip(p20).unwrap_err(),
        CommandError::TipAlreadyAttached {
            pipette: InstrumentModel::P20SingleGen2
        }
    );
    sim.drop_tip(p20).unwrap();
}

#[test]
fn test_slot_occupancy() {
    let mut sim = SimRuntime::with_silent_trace();
    sim.load_labware("opentrons_96_tiprack_20ul", Slot::new(3).unwrap(), "Tips")
        .unwrap();

    assert_eq!(
        sim.load_labware("anything_else", Slot::new(3).unwrap(), "Clash")
            .unwrap_err(),
        CommandError::SlotOccupied(Slot::new(3).unwrap())
    );
    assert!(sim
        .load_module(ModuleKind::TemperatureGen2, Slot::new(3).unwrap())
        .is_err());

    assert!(Slot::new(0).is_err());
    assert!(Slot::new(12).is_err());
}

#[test]
fn test_module_hosts_one_labware() {
    let mut sim = SimRuntime::with_silent_trace();
    let temp_module = sim
        .load_module(ModuleKind::TemperatureGen2, Slot::new(4).unwrap())
        .unwrap();
    sim.load_labware_on_module(
        temp_module,
        "opentrons_24_aluminumblock_generic_2ml_screwcap",
        "Cold Tray",
    )
    .unwrap();

    assert_eq!(
        sim.load_labware_on_module(temp_module, "another_block", "Clash")
            .unwrap_err(),
        CommandError::ModuleOccupied(ModuleKind::TemperatureGen2)
    );
}
