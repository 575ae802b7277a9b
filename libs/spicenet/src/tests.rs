use std::collections::{BTreeMap, BTreeSet};

use rust_decimal_macros::dec;
use test_log::test;

use cirgraph::{CircuitId, DeviceKind, Schematic};

use crate::parser::Parser;
use crate::topology::{build_partition, NetLabels};
use crate::{export_netlist, EmitError};

/// The equivalence classes of a schematic's device pins, keyed by component
/// and pin name so that two schematics can be compared independently of
/// label text. Junction pins are skipped: they have no counterpart after a
/// round trip.
fn partition_classes(sch: &Schematic) -> BTreeSet<BTreeSet<(String, String)>> {
    let mut index = build_partition(sch, sch.root()).unwrap();
    let labels = NetLabels::assign(&mut index);
    let mut by_label: BTreeMap<String, BTreeSet<(String, String)>> = BTreeMap::new();
    fn walk(
        sch: &Schematic,
        id: CircuitId,
        labels: &NetLabels,
        by_label: &mut BTreeMap<String, BTreeSet<(String, String)>>,
    ) {
        let circuit = sch.circuit(id);
        for component_id in circuit.components() {
            let component = sch.component(component_id);
            if component.kind().is_junction() {
                continue;
            }
            for pin in component.pins() {
                by_label
                    .entry(labels.label(pin).to_string())
                    .or_default()
                    .insert((
                        component.name().to_string(),
                        sch.pin(pin).name().to_string(),
                    ));
            }
        }
        for child in circuit.children() {
            walk(sch, child, labels, by_label);
        }
    }
    walk(sch, sch.root(), &labels, &mut by_label);
    by_label.into_values().collect()
}

fn scenario_a_schematic() -> Schematic {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let r1 = sch.add_component(root, "R1", DeviceKind::Resistor);
    sch.set_attr(r1, "R", dec!(1000));
    let v1 = sch.add_component(root, "V1", DeviceKind::Voltage);
    sch.set_attr(v1, "V", dec!(5));
    let gnd = sch.add_component(root, "GND", DeviceKind::Ground);
    sch.add_wire(
        root,
        sch.component_pin(r1, "p").unwrap(),
        sch.component_pin(v1, "p").unwrap(),
    );
    sch.add_wire(
        root,
        sch.component_pin(r1, "n").unwrap(),
        sch.component_pin(v1, "n").unwrap(),
    );
    sch.add_wire(
        root,
        sch.component_pin(v1, "n").unwrap(),
        sch.component_pin(gnd, "p").unwrap(),
    );
    sch
}

#[test]
fn scenario_a_shared_net_and_ground() {
    let sch = scenario_a_schematic();
    let root = sch.root();
    let mut index = build_partition(&sch, root).unwrap();
    let labels = NetLabels::assign(&mut index);

    let r1 = sch.circuit(root).components().next().unwrap();
    let v1 = sch.circuit(root).components().nth(1).unwrap();
    assert_eq!(
        labels.label(sch.component_pin(r1, "p").unwrap()),
        labels.label(sch.component_pin(v1, "p").unwrap())
    );
    assert_eq!(labels.label(sch.component_pin(r1, "n").unwrap()), "0");
    assert_eq!(labels.label(sch.component_pin(v1, "n").unwrap()), "0");
    assert_ne!(labels.label(sch.component_pin(r1, "p").unwrap()), "0");

    let netlist = export_netlist(&sch).unwrap();
    assert!(netlist.contains("R1 N0001 0 1000"));
    assert!(netlist.contains("V1 N0001 0 5"));
}

#[test]
fn scenario_b_junction_pins_share_one_fresh_label() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let j = sch.add_component(root, "J1", DeviceKind::Junction);
    let a = sch.add_pin(j, "a");
    let b = sch.add_pin(j, "b");
    let c = sch.add_pin(j, "c");

    let mut index = build_partition(&sch, root).unwrap();
    let labels = NetLabels::assign(&mut index);
    assert_eq!(labels.label(a), labels.label(b));
    assert_eq!(labels.label(b), labels.label(c));
    assert_ne!(labels.label(a), "0");
    assert!(labels.label(a).starts_with("N000"));
}

#[test]
fn isolated_pins_get_unique_labels() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let r1 = sch.add_component(root, "R1", DeviceKind::Resistor);
    let r2 = sch.add_component(root, "R2", DeviceKind::Resistor);

    let mut index = build_partition(&sch, root).unwrap();
    let labels = NetLabels::assign(&mut index);
    let all: Vec<_> = sch
        .component(r1)
        .pins()
        .chain(sch.component(r2).pins())
        .map(|pin| labels.label(pin).clone())
        .collect();
    let unique: BTreeSet<_> = all.iter().cloned().collect();
    assert_eq!(unique.len(), all.len());
}

#[test]
fn unsupported_device_aborts_the_whole_conversion() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let r1 = sch.add_component(root, "R1", DeviceKind::Resistor);
    sch.set_attr(r1, "R", dec!(10));
    let gyr = sch.add_component(root, "U1", DeviceKind::Gyrator);
    let c1 = sch.add_component(root, "C1", DeviceKind::Capacitor);
    sch.set_attr(c1, "C", dec!(1));

    let err = export_netlist(&sch).unwrap_err();
    match err {
        EmitError::UnsupportedDevice { kind, component } => {
            assert_eq!(kind, DeviceKind::Gyrator);
            assert_eq!(component, gyr);
        }
        other => panic!("expected UnsupportedDevice, got {other}"),
    }
}

#[test]
fn missing_wire_endpoint_aborts_the_whole_conversion() {
    let sch = scenario_a_schematic();
    // Corrupt one wire endpoint through the serialized form; the typed API
    // cannot produce a dangling reference directly.
    let mut value = serde_json::to_value(&sch).unwrap();
    let wires = value["wires"].as_object_mut().unwrap();
    let wire = wires.values_mut().next().unwrap();
    wire["dst"] = serde_json::json!(999);
    let sch: Schematic = serde_json::from_value(value).unwrap();

    let err = export_netlist(&sch).unwrap_err();
    assert!(matches!(err, EmitError::MissingWireEndpoint { .. }));
}

#[test]
fn current_controlled_sources_emit_a_probe() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let f = sch.add_component(root, "amp", DeviceKind::Ccc);
    sch.set_attr(f, "gain", dec!(2));

    let netlist = export_netlist(&sch).unwrap();
    assert!(netlist.contains("V1 N0001 N0002 0"));
    assert!(netlist.contains("F1 N0003 N0004 V1 2"));
}

#[test]
fn conductance_is_emitted_as_reciprocal_resistance() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let g = sch.add_component(root, "G1", DeviceKind::Conductor);
    sch.set_attr(g, "G", dec!(0.001));

    let netlist = export_netlist(&sch).unwrap();
    assert!(netlist.contains("R1 N0001 N0002 1000"));
}

#[test]
fn device_labels_count_per_letter_class() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    for name in ["a", "b"] {
        let r = sch.add_component(root, name, DeviceKind::Resistor);
        sch.set_attr(r, "R", dec!(1));
    }
    let c = sch.add_component(root, "c", DeviceKind::Capacitor);
    sch.set_attr(c, "C", dec!(1));

    let netlist = export_netlist(&sch).unwrap();
    assert!(netlist.contains("R1 "));
    assert!(netlist.contains("R2 "));
    assert!(netlist.contains("C1 "));
    assert!(!netlist.contains("C2 "));
}

#[test]
fn waveform_attributes_are_forwarded_in_order() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let v = sch.add_component(root, "src", DeviceKind::PulseVoltage);
    sch.set_attr(v, "initial_value", dec!(0));
    sch.set_attr(v, "pulsed_value", dec!(5));
    sch.set_attr(v, "delay_time", dec!(0.001));

    let netlist = export_netlist(&sch).unwrap();
    assert!(netlist
        .contains("V1 N0001 N0002 PULSE initial_value=0 pulsed_value=5 delay_time=0.001"));
}

#[test]
fn pwl_values_must_be_numeric_pairs() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let v = sch.add_component(root, "src", DeviceKind::PwlVoltage);
    sch.set_attr(v, "values", "[(0, a)]");
    let err = export_netlist(&sch).unwrap_err();
    assert!(matches!(err, EmitError::InvalidPwl { .. }));

    sch.set_attr(v, "values", "[(0, 0), (1, 5)]");
    let netlist = export_netlist(&sch).unwrap();
    assert!(netlist.contains("V1 N0001 N0002 PWL 0 0 1 5"));
}

#[test]
fn subcircuits_emit_blocks_and_instance_records() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let amp = sch.add_circuit(root, "amp");
    let bp_in = sch.add_boundary_pin(amp, "in");
    let bp_out = sch.add_boundary_pin(amp, "out");
    let r = sch.add_component(amp, "load", DeviceKind::Resistor);
    sch.set_attr(r, "R", dec!(1000));
    sch.add_wire(amp, bp_in, sch.component_pin(r, "p").unwrap());
    sch.add_wire(amp, sch.component_pin(r, "n").unwrap(), bp_out);

    let v1 = sch.add_component(root, "V1", DeviceKind::Voltage);
    sch.set_attr(v1, "V", dec!(5));
    let gnd = sch.add_component(root, "GND", DeviceKind::Ground);
    sch.add_wire(root, sch.component_pin(v1, "p").unwrap(), bp_in);
    sch.add_wire(
        root,
        sch.component_pin(v1, "n").unwrap(),
        sch.component_pin(gnd, "p").unwrap(),
    );

    let netlist = export_netlist(&sch).unwrap();
    assert!(netlist.contains(".SUBCKT amp N0001 N0002"));
    assert!(netlist.contains("R1 N0001 N0002 1000"));
    assert!(netlist.contains(".ENDS amp"));
    assert!(netlist.contains("V1 N0001 0 5"));
    assert!(netlist.contains("X1 N0001 N0002 amp"));

    // The interior precedes the instance record.
    assert!(netlist.find(".SUBCKT amp").unwrap() < netlist.find("X1").unwrap());
}

#[test]
fn scenario_c_probe_absorption() {
    let netlist = "* probe test\nV99 a b 0\nF1 x y V99 2\n";
    let parsed = Parser::parse(netlist).unwrap();
    let result = parsed.to_graph().unwrap();
    let sch = &result.schematic;
    let root = sch.root();

    let components: Vec<_> = sch.circuit(root).components().collect();
    assert_eq!(components.len(), 1);
    let f1 = sch.component(components[0]);
    assert_eq!(f1.kind(), DeviceKind::Ccc);
    assert_eq!(f1.name(), "F1");
    assert_eq!(f1.pins().count(), 4);
}

#[test]
fn missing_probe_is_an_error() {
    let netlist = "* probe test\nF1 x y V99 2\n";
    let parsed = Parser::parse(netlist).unwrap();
    assert!(parsed.to_graph().is_err());
}

#[test]
fn scenario_d_instance_isolation() {
    let netlist = "* two instances\n\
                   .subckt amp in out\n\
                   R1 in out 1000\n\
                   .ends\n\
                   X1 a b amp\n\
                   X2 c d amp\n";
    let parsed = Parser::parse(netlist).unwrap();
    let result = parsed.to_graph().unwrap();
    let sch = &result.schematic;
    let root = sch.root();

    let children: Vec<_> = sch.circuit(root).children().collect();
    assert_eq!(children.len(), 3);
    let x1 = children[0];
    let x2 = children[1];
    assert_eq!(sch.circuit(x1).name(), "X1");
    assert_eq!(sch.circuit(x2).name(), "X2");
    assert_eq!(sch.circuit(x1).components().count(), 0);
    assert_eq!(sch.circuit(x1).exposed().count(), 2);

    // The two instances' nets stay apart.
    let mut index = build_partition(sch, root).unwrap();
    let labels = NetLabels::assign(&mut index);
    let x1_p1 = sch.circuit(x1).exposed().next().unwrap();
    let x2_p1 = sch.circuit(x2).exposed().next().unwrap();
    assert_ne!(labels.label(x1_p1), labels.label(x2_p1));
}

#[test]
fn reverse_ground_is_synthesized_once_and_shared() {
    let netlist = "* grounded\nR1 in 0 1000\nC1 in 0 0.5\n";
    let parsed = Parser::parse(netlist).unwrap();
    let result = parsed.to_graph().unwrap();
    let sch = &result.schematic;
    let root = sch.root();

    let grounds: Vec<_> = sch
        .circuit(root)
        .components()
        .filter(|&id| sch.component(id).kind().is_ground())
        .collect();
    assert_eq!(grounds.len(), 1);

    let mut index = build_partition(sch, root).unwrap();
    let labels = NetLabels::assign(&mut index);
    let r1 = sch.circuit(root).components().next().unwrap();
    assert_eq!(labels.label(sch.component_pin(r1, "n").unwrap()), "0");
}

#[test]
fn round_trip_preserves_the_pin_partition() {
    let sch = scenario_a_schematic();
    let netlist = export_netlist(&sch).unwrap();
    let parsed = Parser::parse(netlist).unwrap();
    let result = parsed.to_graph().unwrap();

    assert_eq!(
        partition_classes(&sch),
        partition_classes(&result.schematic)
    );
}

#[test]
fn round_trip_preserves_waveform_parameters() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let v = sch.add_component(root, "src", DeviceKind::PulseVoltage);
    sch.set_attr(v, "initial_value", dec!(0));
    sch.set_attr(v, "pulsed_value", dec!(5));

    let netlist = export_netlist(&sch).unwrap();
    let result = Parser::parse(netlist).unwrap().to_graph().unwrap();
    let sch2 = &result.schematic;
    let v2 = sch2.circuit(sch2.root()).components().next().unwrap();
    let component = sch2.component(v2);
    assert_eq!(component.kind(), DeviceKind::PulseVoltage);
    let keys: Vec<_> = component.attrs().map(|(k, _)| k.to_string()).collect();
    assert_eq!(keys, vec!["initial_value", "pulsed_value"]);
}
