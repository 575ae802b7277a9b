use rust_decimal_macros::dec;
use test_log::test;

use crate::layout::{GridPlacer, Placer, Position};
use crate::*;

#[test]
fn component_gets_declared_pins() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let r1 = sch.add_component(root, "R1", DeviceKind::Resistor);
    let names: Vec<_> = sch
        .component(r1)
        .pins()
        .map(|pin| sch.pin(pin).name().to_string())
        .collect();
    assert_eq!(names, vec!["p", "n"]);

    let m1 = sch.add_component(root, "M1", DeviceKind::Nmos);
    assert_eq!(sch.component(m1).pins().count(), 4);
    assert!(sch.component_pin(m1, "G").is_some());
    assert!(sch.component_pin(m1, "x").is_none());
}

#[test]
fn junction_pins_are_added_individually() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let j = sch.add_component(root, "J1", DeviceKind::Junction);
    assert_eq!(sch.component(j).pins().count(), 0);
    sch.add_pin(j, "a");
    sch.add_pin(j, "b");
    sch.add_pin(j, "c");
    assert_eq!(sch.component(j).pins().count(), 3);
}

#[test]
fn attrs_preserve_declaration_order() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let v1 = sch.add_component(root, "V1", DeviceKind::PulseVoltage);
    sch.set_attr(v1, "initial_value", dec!(0));
    sch.set_attr(v1, "pulsed_value", dec!(5));
    sch.set_attr(v1, "delay_time", dec!(1));
    let keys: Vec<_> = sch
        .component(v1)
        .attrs()
        .map(|(k, _)| k.as_str())
        .collect();
    assert_eq!(keys, vec!["initial_value", "pulsed_value", "delay_time"]);
}

#[test]
fn exposed_pins_keep_declared_order() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let sub = sch.add_circuit(root, "amp");
    let p1 = sch.add_boundary_pin(sub, "p1");
    let p2 = sch.add_boundary_pin(sub, "p2");
    let exposed: Vec<_> = sch.circuit(sub).exposed().collect();
    assert_eq!(exposed, vec![p1, p2]);
    assert_eq!(sch.pin(p1).owner(), PinOwner::Boundary(sub));
}

#[test]
#[should_panic(expected = "distinct pins")]
fn self_loop_wires_are_rejected() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let r1 = sch.add_component(root, "R1", DeviceKind::Resistor);
    let p = sch.component_pin(r1, "p").unwrap();
    sch.add_wire(root, p, p);
}

#[test]
fn validate_reports_dangling_wire_endpoint() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let r1 = sch.add_component(root, "R1", DeviceKind::Resistor);
    let p = sch.component_pin(r1, "p").unwrap();
    // A wire to a pin id that was never allocated.
    sch.add_wire(root, p, PinId(999));
    let log = sch.validate();
    assert!(log.has_error());
    assert_eq!(log.num_errors(), 1);
}

#[test]
fn validate_accepts_well_formed_schematic() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let r1 = sch.add_component(root, "R1", DeviceKind::Resistor);
    let v1 = sch.add_component(root, "V1", DeviceKind::Voltage);
    sch.add_wire(
        root,
        sch.component_pin(r1, "p").unwrap(),
        sch.component_pin(v1, "p").unwrap(),
    );
    let log = sch.validate();
    assert!(!log.has_error());
    assert_eq!(log.num_warnings(), 0);
}

#[test]
fn schematic_round_trips_through_serde() {
    let mut sch = Schematic::new("top");
    let root = sch.root();
    let r1 = sch.add_component(root, "R1", DeviceKind::Resistor);
    sch.set_attr(r1, "R", dec!(1000));
    sch.set_component_position(r1, Position { x: 250.0, y: 50.0 });
    let json = serde_json::to_string(&sch).unwrap();
    let back: Schematic = serde_json::from_str(&json).unwrap();
    assert_eq!(back.name(), "top");
    let r1_back = back.circuit(back.root()).components().next().unwrap();
    assert_eq!(back.component(r1_back).attr("R"), Some(&AttrValue::Numeric(dec!(1000))));
    assert_eq!(back.component(r1_back).position(), Some(Position { x: 250.0, y: 50.0 }));
}

#[test]
fn grid_placer_is_deterministic() {
    let mut a = GridPlacer::default();
    let mut b = GridPlacer::default();
    for _ in 0..10 {
        let pa = a.next_position();
        let pb = b.next_position();
        assert_eq!(pa, pb);
    }
}
