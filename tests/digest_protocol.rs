use deckhand::{
    run_restriction_digest, CommandError, LabRuntime, Microliters, ProtocolConfig, SimRuntime,
};

#[test]
fn test_default_protocol_runs_clean() {
    let mut sim = SimRuntime::with_silent_trace();
    let cfg = ProtocolConfig::default();

    run_restriction_digest(&mut sim, &cfg).expect("reference protocol must run clean");

    // Two dry checks plus one fresh tip per reagent addition.
    assert_eq!(sim.tips_consumed(), 6);
    assert_eq!(sim.commands_executed(), sim.trace().len());

    let lines = sim.trace().lines();
    assert_eq!(lines.first().map(String::as_str), Some("Homing gantry"));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("thermocycler: setting block temperature to 4 C")
    );

    // The four additions land in the reaction well, in order.
    let dispenses: Vec<&String> = lines
        .iter()
        .filter(|l| l.contains("Reaction Plate [A1] <---"))
        .collect();
    assert_eq!(
        dispenses,
        vec![
            "##### Reaction Plate [A1] <--- (38 uL)",
            "##### Reaction Plate [A1] <--- (5 uL)",
            "##### Reaction Plate [A1] <--- (5 uL)",
            "##### Reaction Plate [A1] <--- (2 uL)",
        ]
    );

    // The digest itself runs as one closed-lid profile.
    assert!(lines.iter().any(|l| l == "thermocycler: closing lid"));
    assert!(lines
        .iter()
        .any(|l| l == "thermocycler: running profile [37 C for 1800 s, 80 C for 1200 s] (2 steps)"));
}

#[test]
fn test_protocol_trace_is_deterministic() {
    let cfg = ProtocolConfig::default();

    let mut first = SimRuntime::with_silent_trace();
    run_restriction_digest(&mut first, &cfg).unwrap();
    let mut second = SimRuntime::with_silent_trace();
    run_restriction_digest(&mut second, &cfg).unwrap();

    assert_eq!(first.trace().lines(), second.trace().lines());
}

#[test]
fn test_config_rejects_unreachable_volumes() {
    // 0.5 uL of enzyme is below what the P20 can draw.
    let cfg = ProtocolConfig {
        enzyme_volume: Microliters(0.5),
        ..ProtocolConfig::default()
    };
    let err = cfg.validate().unwrap_err();
    assert!(matches!(err, CommandError::VolumeOutOfRange { .. }));

    // And the run must refuse before touching the deck.
    let mut sim = SimRuntime::with_silent_trace();
    assert!(run_restriction_digest(&mut sim, &cfg).is_err());
    assert!(sim.trace().is_empty());
}

#[test]
fn test_config_yaml_round_trip() {
    let cfg = ProtocolConfig::default();
    let yaml = cfg.to_yaml().unwrap();
    let parsed = ProtocolConfig::from_yaml_str(&yaml).unwrap();
    assert_eq!(parsed, cfg);
}

#[test]
fn test_config_partial_override() {
    let parsed = ProtocolConfig::from_yaml_str(
        "water_volume: 40.0\nstarting_tip_p20: B2\ndigest_seconds: 2400\n",
    )
    .unwrap();

    assert_eq!(parsed.water_volume, Microliters(40.0));
    assert_eq!(parsed.starting_tip_p20, "B2".parse().unwrap());
    assert_eq!(parsed.digest_seconds, 2400);
    // Untouched fields keep the reference values.
    assert_eq!(parsed.enzyme_volume, ProtocolConfig::default().enzyme_volume);
}

#[test]
fn test_config_rejects_unknown_fields() {
    assert!(ProtocolConfig::from_yaml_str("water_volme: 40.0\n").is_err());
}
