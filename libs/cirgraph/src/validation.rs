//! Structural validation of schematics.
//!
//! Deserialized schematics are not guaranteed to uphold the model's
//! invariants, so hosts can run these checks before conversion:
//!
//! - every wire and component listed by a circuit resolves;
//! - wire endpoints resolve and are distinct pins;
//! - component pins point back at their owning component;
//! - exposed boundary pins belong to the circuit exposing them;
//! - junctions have at least two pins (warning only).

use crate::diagnostics::MessageLog;
use crate::{PinOwner, Schematic};

pub(crate) fn validate(sch: &Schematic) -> MessageLog {
    let mut log = MessageLog::new();

    for (&circuit_id, circuit) in sch.circuits.iter() {
        for wire_id in circuit.wires() {
            let Some(wire) = sch.try_wire(wire_id) else {
                log.error(
                    circuit_id,
                    format!("circuit lists a wire that does not exist: {wire_id}"),
                );
                continue;
            };
            let (src, dst) = wire.endpoints();
            for endpoint in [src, dst] {
                if sch.try_pin(endpoint).is_none() {
                    log.error(
                        wire_id,
                        format!("wire endpoint does not resolve to a pin: {endpoint}"),
                    );
                }
            }
            if src == dst {
                log.error(wire_id, "wire connects a pin to itself");
            }
        }

        for component_id in circuit.components() {
            let Some(component) = sch.try_component(component_id) else {
                log.error(
                    circuit_id,
                    format!("circuit lists a component that does not exist: {component_id}"),
                );
                continue;
            };
            if component.circuit() != circuit_id {
                log.error(
                    component_id,
                    format!("component is listed by {circuit_id} but owned by another circuit"),
                );
            }
            for pin_id in component.pins() {
                match sch.try_pin(pin_id).map(|pin| pin.owner()) {
                    Some(PinOwner::Component(owner)) if owner == component_id => (),
                    Some(_) => log.error(
                        pin_id,
                        format!("pin is listed by {component_id} but owned elsewhere"),
                    ),
                    None => log.error(
                        component_id,
                        format!("component pin does not resolve: {pin_id}"),
                    ),
                }
            }
            if component.kind().is_junction() && component.pins().count() < 2 {
                log.warning(component_id, "junction with fewer than two pins");
            }
        }

        for pin_id in circuit.exposed() {
            match sch.try_pin(pin_id).map(|pin| pin.owner()) {
                Some(PinOwner::Boundary(owner)) if owner == circuit_id => (),
                Some(_) => log.error(
                    pin_id,
                    format!("exposed pin is not a boundary pin of {circuit_id}"),
                ),
                None => log.error(
                    circuit_id,
                    format!("exposed pin does not resolve: {pin_id}"),
                ),
            }
        }
    }

    log
}
