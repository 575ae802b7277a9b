//! Hierarchical circuit graph model.
//!
//! A [`Schematic`] owns a tree of circuits. Each circuit contains components
//! (tagged with a [`DeviceKind`]), explicit wires between pins, junction and
//! ground markers, and optionally nested child circuits. A circuit used as a
//! sub-circuit exposes an ordered list of boundary pins as its external
//! interface.
//!
//! The structures in this crate use strings, rather than generics, to name
//! components, pins, and attributes. This makes the model easy to build from
//! netlist text and easy to serialize for host tools.
//!
//! All identifiers are allocated by the owning schematic and are unique
//! across the whole schematic, so a pin keeps its identity across sub-circuit
//! boundaries.
#![warn(missing_docs)]

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use arcstr::ArcStr;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod diagnostics;
mod kind;
pub mod layout;
mod validation;

pub use kind::DeviceKind;

use diagnostics::MessageLog;
use layout::Position;

#[cfg(test)]
mod tests;

/// An opaque circuit identifier.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CircuitId(u64);

/// An opaque component identifier.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ComponentId(u64);

/// An opaque pin identifier.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PinId(u64);

/// An opaque wire identifier.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct WireId(u64);

impl Display for CircuitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "circuit{}", self.0)
    }
}

impl Display for ComponentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "component{}", self.0)
    }
}

impl Display for PinId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "pin{}", self.0)
    }
}

impl Display for WireId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "wire{}", self.0)
    }
}

/// An attribute value attached to a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// A numeric value.
    Numeric(Decimal),
    /// A string value.
    String(ArcStr),
    /// A boolean value.
    Bool(bool),
}

impl AttrValue {
    /// The numeric content of this value, if it has one.
    ///
    /// String values that parse as decimal numbers are accepted, since
    /// attribute values round-trip through text.
    pub fn as_numeric(&self) -> Option<Decimal> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::String(s) => s.parse().ok(),
            Self::Bool(_) => None,
        }
    }
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(value) => write!(f, "{value}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<Decimal> for AttrValue {
    #[inline]
    fn from(value: Decimal) -> Self {
        Self::Numeric(value)
    }
}

impl From<ArcStr> for AttrValue {
    #[inline]
    fn from(value: ArcStr) -> Self {
        Self::String(value)
    }
}

impl From<&str> for AttrValue {
    #[inline]
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for AttrValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::String(value.into())
    }
}

impl From<bool> for AttrValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// The owner of a pin: a component, or a circuit boundary.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PinOwner {
    /// The pin is a terminal of a component.
    Component(ComponentId),
    /// The pin is part of a circuit's external interface.
    Boundary(CircuitId),
}

/// A connection point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    name: ArcStr,
    owner: PinOwner,
    position: Option<Position>,
}

impl Pin {
    /// The name of this pin.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The owner of this pin.
    #[inline]
    pub fn owner(&self) -> PinOwner {
        self.owner
    }

    /// The layout position of this pin, if one has been assigned.
    #[inline]
    pub fn position(&self) -> Option<Position> {
        self.position
    }
}

/// An explicit connection between two pins.
///
/// Wires are unordered; `src`/`dst` naming only reflects creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wire {
    src: PinId,
    dst: PinId,
}

impl Wire {
    /// The two endpoints of this wire.
    #[inline]
    pub fn endpoints(&self) -> (PinId, PinId) {
        (self.src, self.dst)
    }
}

/// A schematic component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    name: ArcStr,
    kind: DeviceKind,
    circuit: CircuitId,
    attrs: IndexMap<ArcStr, AttrValue>,
    pins: Vec<PinId>,
    position: Option<Position>,
}

impl Component {
    /// The name of this component.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The device kind of this component.
    #[inline]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// The circuit this component belongs to.
    #[inline]
    pub fn circuit(&self) -> CircuitId {
        self.circuit
    }

    /// The pins of this component, in declaration order.
    #[inline]
    pub fn pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.pins.iter().copied()
    }

    /// The attributes of this component, in declaration order.
    #[inline]
    pub fn attrs(&self) -> impl Iterator<Item = (&ArcStr, &AttrValue)> {
        self.attrs.iter()
    }

    /// The value of the given attribute.
    #[inline]
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// The layout position of this component, if one has been assigned.
    #[inline]
    pub fn position(&self) -> Option<Position> {
        self.position
    }
}

/// A circuit: a container of components, wires, and nested circuits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    name: ArcStr,
    parent: Option<CircuitId>,
    components: Vec<ComponentId>,
    wires: Vec<WireId>,
    children: Vec<CircuitId>,
    exposed: Vec<PinId>,
    position: Option<Position>,
}

impl Circuit {
    /// The name of this circuit.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The parent of this circuit, if it is nested.
    #[inline]
    pub fn parent(&self) -> Option<CircuitId> {
        self.parent
    }

    /// The components of this circuit, in creation order.
    #[inline]
    pub fn components(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().copied()
    }

    /// The wires of this circuit, in creation order.
    #[inline]
    pub fn wires(&self) -> impl Iterator<Item = WireId> + '_ {
        self.wires.iter().copied()
    }

    /// The nested child circuits, in creation order.
    #[inline]
    pub fn children(&self) -> impl Iterator<Item = CircuitId> + '_ {
        self.children.iter().copied()
    }

    /// The boundary pins exposed by this circuit, in declared order.
    ///
    /// This is the circuit's external interface when it is used as a
    /// sub-circuit.
    #[inline]
    pub fn exposed(&self) -> impl Iterator<Item = PinId> + '_ {
        self.exposed.iter().copied()
    }

    /// The layout position of this circuit node, if one has been assigned.
    #[inline]
    pub fn position(&self) -> Option<Position> {
        self.position
    }
}

/// A schematic: the owner of a circuit tree.
///
/// All node identifiers are allocated here and are unique across the whole
/// schematic. Id counters are instance-scoped; two schematics never share
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schematic {
    name: ArcStr,
    circuit_id: u64,
    component_id: u64,
    pin_id: u64,
    wire_id: u64,
    circuits: HashMap<CircuitId, Circuit>,
    components: HashMap<ComponentId, Component>,
    pins: HashMap<PinId, Pin>,
    wires: HashMap<WireId, Wire>,
    root: CircuitId,
}

impl Schematic {
    /// Creates a new schematic whose root circuit has the given name.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        let name = name.into();
        let root = CircuitId(1);
        let mut circuits = HashMap::new();
        circuits.insert(
            root,
            Circuit {
                name: name.clone(),
                parent: None,
                components: Vec::new(),
                wires: Vec::new(),
                children: Vec::new(),
                exposed: Vec::new(),
                position: None,
            },
        );
        Self {
            name,
            circuit_id: 1,
            component_id: 0,
            pin_id: 0,
            wire_id: 0,
            circuits,
            components: HashMap::new(),
            pins: HashMap::new(),
            wires: HashMap::new(),
            root,
        }
    }

    /// The name of this schematic.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The root circuit.
    #[inline]
    pub fn root(&self) -> CircuitId {
        self.root
    }

    /// Adds a nested circuit under the given parent.
    pub fn add_circuit(&mut self, parent: CircuitId, name: impl Into<ArcStr>) -> CircuitId {
        self.circuit_id += 1;
        let id = CircuitId(self.circuit_id);
        let name = name.into();
        tracing::debug!(%id, %name, %parent, "adding circuit");
        self.circuits.insert(
            id,
            Circuit {
                name,
                parent: Some(parent),
                components: Vec::new(),
                wires: Vec::new(),
                children: Vec::new(),
                exposed: Vec::new(),
                position: None,
            },
        );
        self.circuit_mut(parent).children.push(id);
        id
    }

    /// Adds a component of the given kind to a circuit.
    ///
    /// The component receives the pin set its kind declares (see
    /// [`DeviceKind::pins`]). Additional pins, e.g. for junctions, can be
    /// added with [`add_pin`](Schematic::add_pin).
    ///
    /// # Panics
    ///
    /// Panics if the circuit does not exist.
    pub fn add_component(
        &mut self,
        circuit: CircuitId,
        name: impl Into<ArcStr>,
        kind: DeviceKind,
    ) -> ComponentId {
        self.component_id += 1;
        let id = ComponentId(self.component_id);
        let name = name.into();
        tracing::debug!(%id, %name, ?kind, %circuit, "adding component");
        self.components.insert(
            id,
            Component {
                name,
                kind,
                circuit,
                attrs: IndexMap::new(),
                pins: Vec::new(),
                position: None,
            },
        );
        self.circuit_mut(circuit).components.push(id);
        for pin_name in kind.pins() {
            self.add_pin(id, *pin_name);
        }
        id
    }

    /// Adds a pin to the given component.
    ///
    /// # Panics
    ///
    /// Panics if the component does not exist.
    pub fn add_pin(&mut self, component: ComponentId, name: impl Into<ArcStr>) -> PinId {
        self.pin_id += 1;
        let id = PinId(self.pin_id);
        self.pins.insert(
            id,
            Pin {
                name: name.into(),
                owner: PinOwner::Component(component),
                position: None,
            },
        );
        self.component_mut(component).pins.push(id);
        id
    }

    /// Adds a boundary pin to the given circuit and exposes it.
    ///
    /// Boundary pins form the circuit's external interface, in the order
    /// they are added.
    ///
    /// # Panics
    ///
    /// Panics if the circuit does not exist.
    pub fn add_boundary_pin(&mut self, circuit: CircuitId, name: impl Into<ArcStr>) -> PinId {
        self.pin_id += 1;
        let id = PinId(self.pin_id);
        self.pins.insert(
            id,
            Pin {
                name: name.into(),
                owner: PinOwner::Boundary(circuit),
                position: None,
            },
        );
        self.circuit_mut(circuit).exposed.push(id);
        id
    }

    /// Adds a wire between two pins in the given circuit.
    ///
    /// Endpoint identifiers are not required to resolve at creation time;
    /// converters and [`validate`](Schematic::validate) report unresolved
    /// endpoints. This keeps deserialized schematics representable.
    ///
    /// # Panics
    ///
    /// Panics if the two endpoints are the same pin: wires never connect a
    /// pin to itself.
    pub fn add_wire(&mut self, circuit: CircuitId, src: PinId, dst: PinId) -> WireId {
        assert_ne!(src, dst, "wire endpoints must be distinct pins");
        self.wire_id += 1;
        let id = WireId(self.wire_id);
        tracing::debug!(%id, %src, %dst, %circuit, "adding wire");
        self.wires.insert(id, Wire { src, dst });
        self.circuit_mut(circuit).wires.push(id);
        id
    }

    /// Sets the value of a component attribute, preserving declaration order.
    ///
    /// # Panics
    ///
    /// Panics if the component does not exist.
    pub fn set_attr(
        &mut self,
        component: ComponentId,
        name: impl Into<ArcStr>,
        value: impl Into<AttrValue>,
    ) {
        self.component_mut(component)
            .attrs
            .insert(name.into(), value.into());
    }

    /// Gets the circuit with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no circuit has the given ID.
    /// For a non-panicking alternative, see [`try_circuit`](Schematic::try_circuit).
    pub fn circuit(&self, id: CircuitId) -> &Circuit {
        self.circuits.get(&id).unwrap()
    }

    /// Gets the circuit with the given ID.
    #[inline]
    pub fn try_circuit(&self, id: CircuitId) -> Option<&Circuit> {
        self.circuits.get(&id)
    }

    /// Gets the component with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no component has the given ID.
    pub fn component(&self, id: ComponentId) -> &Component {
        self.components.get(&id).unwrap()
    }

    /// Gets the component with the given ID.
    #[inline]
    pub fn try_component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Gets the pin with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no pin has the given ID.
    pub fn pin(&self, id: PinId) -> &Pin {
        self.pins.get(&id).unwrap()
    }

    /// Gets the pin with the given ID.
    #[inline]
    pub fn try_pin(&self, id: PinId) -> Option<&Pin> {
        self.pins.get(&id)
    }

    /// Gets the wire with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no wire has the given ID.
    pub fn wire(&self, id: WireId) -> &Wire {
        self.wires.get(&id).unwrap()
    }

    /// Gets the wire with the given ID.
    #[inline]
    pub fn try_wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(&id)
    }

    /// Finds a pin of the given component by name.
    pub fn component_pin(&self, component: ComponentId, name: &str) -> Option<PinId> {
        self.component(component)
            .pins
            .iter()
            .copied()
            .find(|&pin| self.pin(pin).name == name)
    }

    /// Sets the layout position of a circuit node.
    pub fn set_circuit_position(&mut self, id: CircuitId, position: Position) {
        self.circuit_mut(id).position = Some(position);
    }

    /// Sets the layout position of a component.
    pub fn set_component_position(&mut self, id: ComponentId, position: Position) {
        self.component_mut(id).position = Some(position);
    }

    /// Sets the layout position of a pin.
    pub fn set_pin_position(&mut self, id: PinId, position: Position) {
        self.pins.get_mut(&id).unwrap().position = Some(position);
    }

    /// Checks structural invariants, returning any findings as diagnostics.
    ///
    /// Deserialized schematics are not guaranteed to uphold the model's
    /// invariants; run this before converting untrusted input.
    pub fn validate(&self) -> MessageLog {
        validation::validate(self)
    }

    fn circuit_mut(&mut self, id: CircuitId) -> &mut Circuit {
        self.circuits.get_mut(&id).unwrap()
    }

    fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        self.components.get_mut(&id).unwrap()
    }
}
