//! Net topology resolution.
//!
//! Pins connected by wires, junction co-membership, or exposed sub-circuit
//! boundaries are electrically equivalent and share one net. The partition
//! is modelled with a union-find table: each pin is an element, wires and
//! junctions union their members, and ground markers taint their class.
//! One pass over the pins then assigns each class its label.
//!
//! The same structure serves the reverse direction as the equivalence index
//! used to suppress redundant wires.

use std::collections::HashMap;

use arcstr::ArcStr;
use cirgraph::{CircuitId, PinId, Schematic};

use crate::EmitError;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
struct PinKey(u32);

type PinUf = ena::unify::InPlaceUnificationTable<PinKey>;

/// The value associated with a class of merged pins.
///
/// A class is a ground net as soon as any member pin belongs to a ground
/// marker; the flag survives every later merge.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
struct NetClass {
    ground: bool,
}

impl ena::unify::UnifyKey for PinKey {
    type Value = NetClass;
    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        Self(u)
    }

    fn tag() -> &'static str {
        "PinKey"
    }
}

impl ena::unify::UnifyValue for NetClass {
    type Error = ena::unify::NoError;

    fn unify_values(value1: &Self, value2: &Self) -> Result<Self, Self::Error> {
        Ok(NetClass {
            ground: value1.ground || value2.ground,
        })
    }
}

/// A union-find index over pin equivalence.
///
/// Registration order is remembered so that label assignment is
/// deterministic for a given schematic.
#[derive(Clone)]
pub struct NetIndex {
    pin_to_key: HashMap<PinId, PinKey>,
    order: Vec<PinId>,
    uf: PinUf,
}

impl Default for NetIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl NetIndex {
    /// Creates a new, empty index.
    pub fn new() -> Self {
        Self {
            pin_to_key: HashMap::new(),
            order: Vec::new(),
            uf: PinUf::new(),
        }
    }

    /// Adds a pin to the index. Does nothing if the pin is already known.
    pub fn register(&mut self, pin: PinId) {
        if self.pin_to_key.contains_key(&pin) {
            return;
        }
        let key = self.uf.new_key(NetClass::default());
        self.pin_to_key.insert(pin, key);
        self.order.push(pin);
    }

    /// Marks the pin's class as the ground net.
    pub fn mark_ground(&mut self, pin: PinId) {
        self.register(pin);
        let key = self.pin_to_key[&pin];
        self.uf.union_value(key, NetClass { ground: true });
    }

    /// Merges the classes of the two pins.
    pub fn connect(&mut self, a: PinId, b: PinId) {
        self.register(a);
        self.register(b);
        self.uf.union(self.pin_to_key[&a], self.pin_to_key[&b]);
    }

    /// Returns `true` if the two pins are known to share a net.
    pub fn connected(&mut self, a: PinId, b: PinId) -> bool {
        match (self.pin_to_key.get(&a), self.pin_to_key.get(&b)) {
            (Some(&ka), Some(&kb)) => self.uf.unioned(ka, kb),
            _ => false,
        }
    }

    /// Returns `true` if the pin's class is the ground net.
    pub fn is_ground(&mut self, pin: PinId) -> bool {
        let key = self.pin_to_key[&pin];
        self.uf.probe_value(key).ground
    }

    /// The registered pins, in registration order.
    pub fn pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.order.iter().copied()
    }

    fn root(&mut self, pin: PinId) -> PinKey {
        let key = self.pin_to_key[&pin];
        self.uf.find(key)
    }
}

/// Builds the pin partition for the circuit tree rooted at `root`.
///
/// Child circuits are processed before their parents so nested topology is
/// known before wires at the parent level bridge into it. Fails with
/// [`EmitError::MissingWireEndpoint`] if a wire endpoint does not resolve.
pub fn build_partition(sch: &Schematic, root: CircuitId) -> Result<NetIndex, EmitError> {
    let mut index = NetIndex::new();
    build_circuit(sch, root, &mut index)?;
    Ok(index)
}

fn build_circuit(sch: &Schematic, id: CircuitId, index: &mut NetIndex) -> Result<(), EmitError> {
    let circuit = sch.circuit(id);
    for child in circuit.children() {
        build_circuit(sch, child, index)?;
    }

    for pin in circuit.exposed() {
        index.register(pin);
    }

    for component_id in circuit.components() {
        let component = sch.component(component_id);
        let kind = component.kind();
        let mut junction_head: Option<PinId> = None;
        for pin in component.pins() {
            index.register(pin);
            if kind.is_ground() {
                index.mark_ground(pin);
            } else if kind.is_junction() {
                // All pins of a junction are one electrical point, wired or
                // not.
                match junction_head {
                    Some(head) => index.connect(head, pin),
                    None => junction_head = Some(pin),
                }
            }
        }
    }

    for wire_id in circuit.wires() {
        let wire = sch
            .try_wire(wire_id)
            .ok_or(EmitError::MissingWireEndpoint { wire: wire_id })?;
        let (src, dst) = wire.endpoints();
        if sch.try_pin(src).is_none() || sch.try_pin(dst).is_none() {
            return Err(EmitError::MissingWireEndpoint { wire: wire_id });
        }
        if src != dst {
            index.connect(src, dst);
        }
    }

    Ok(())
}

/// The label assignment for a pin partition.
///
/// Ground classes receive the reserved label `0`; every other class mints a
/// fresh `N000<n>` label, with the counter scoped to this assignment.
pub struct NetLabels {
    labels: HashMap<PinId, ArcStr>,
    nets: u64,
}

impl NetLabels {
    /// Assigns one label per equivalence class of the given index.
    pub fn assign(index: &mut NetIndex) -> Self {
        let mut by_class: HashMap<PinKey, ArcStr> = HashMap::new();
        let mut labels = HashMap::new();
        let mut nets = 0u64;
        let pins: Vec<PinId> = index.pins().collect();
        for pin in pins {
            let root = index.root(pin);
            let label = match by_class.get(&root) {
                Some(label) => label.clone(),
                None => {
                    let label = if index.is_ground(pin) {
                        crate::GROUND_LABEL.clone()
                    } else {
                        nets += 1;
                        arcstr::format!("N000{}", nets)
                    };
                    by_class.insert(root, label.clone());
                    label
                }
            };
            labels.insert(pin, label);
        }
        Self { labels, nets }
    }

    /// The label of the given pin.
    ///
    /// # Panics
    ///
    /// Panics if the pin was not part of the partition this assignment was
    /// built from.
    pub fn label(&self, pin: PinId) -> &ArcStr {
        self.labels.get(&pin).unwrap()
    }

    /// The label of the given pin, if it was part of the partition.
    #[inline]
    pub fn try_label(&self, pin: PinId) -> Option<&ArcStr> {
        self.labels.get(&pin)
    }

    /// The number of non-ground nets that were labelled.
    #[inline]
    pub fn num_nets(&self) -> u64 {
        self.nets
    }
}
