//! Convert parsed netlists back into circuit graphs.

use std::collections::{HashMap, HashSet};

use arcstr::ArcStr;
use cirgraph::diagnostics::MessageLog;
use cirgraph::layout::{GridPlacer, Placer};
use cirgraph::{AttrValue, CircuitId, ComponentId, DeviceKind, PinId, Schematic};
use indexmap::IndexMap;
use itertools::Itertools;
use rust_decimal::Decimal;
use thiserror::Error;

use super::{Ast, Component, Elem, Node, Subckt, Substr};
use crate::topology::NetIndex;
use crate::{devices, GROUND_LABEL};

/// The type representing subcircuit names.
pub type SubcktName = Substr;

/// A netlist reconstruction result.
pub type ConvResult<T> = std::result::Result<T, ConvError>;

/// A netlist reconstruction error.
#[derive(Debug, Error)]
pub enum ConvError {
    /// A current-controlled source references a probe source that does not
    /// exist in its scope.
    #[error("current-controlled source `{record}` references missing probe `{probe}`")]
    MissingProbe {
        /// The name of the dependent source record.
        record: String,
        /// The name of the missing probe.
        probe: String,
    },
    /// The given expression is not a valid numeric literal.
    #[error("invalid literal: `{0}`")]
    InvalidLiteral(Substr),
    /// An independent source uses a waveform shape with no graph kind.
    #[error("unknown waveform shape: `{0}`")]
    UnknownWaveform(Substr),
}

/// The output of a reconstruction: the schematic plus any diagnostics
/// collected along the way.
pub struct Reconstruction {
    /// The reconstructed schematic.
    pub schematic: Schematic,
    /// Diagnostics attached to the nodes that caused them.
    pub messages: MessageLog,
}

/// Per-scope net membership: net name to the pins bound to that net, in
/// record order.
type NetMembership = IndexMap<Substr, Vec<PinId>>;

/// Converts a parsed netlist to a circuit graph.
///
/// Reconstruction proceeds top-down: the scope's components are created
/// first, then nested subcircuit definitions are recursed into, and finally
/// wires are synthesized from each net's pin membership, suppressing wires
/// between pins an equivalence index already knows to be connected.
pub struct GraphReconstructor<'a> {
    ast: &'a Ast,
    sch: Schematic,
    subckts: HashMap<SubcktName, &'a Subckt>,
    index: NetIndex,
    placer: Box<dyn Fn() -> Box<dyn Placer>>,
    log: MessageLog,
}

impl<'a> GraphReconstructor<'a> {
    /// Create a new graph reconstructor.
    pub fn new(name: impl Into<ArcStr>, ast: &'a Ast) -> Self {
        Self {
            ast,
            sch: Schematic::new(name),
            subckts: Default::default(),
            index: NetIndex::new(),
            placer: Box::new(|| Box::new(GridPlacer::default()) as Box<dyn Placer>),
            log: MessageLog::new(),
        }
    }

    /// Replaces the layout position source. The factory is invoked once per
    /// scope, so each scope's layout starts fresh.
    pub fn with_placer(mut self, factory: Box<dyn Fn() -> Box<dyn Placer>>) -> Self {
        self.placer = factory;
        self
    }

    /// Consumes the reconstructor, yielding the schematic.
    pub fn convert(mut self) -> ConvResult<Reconstruction> {
        self.map_subckts();
        let root = self.sch.root();
        let records: Vec<&'a Component> = self
            .ast
            .elems
            .iter()
            .filter_map(|elem| match elem {
                Elem::Component(c) => Some(c),
                _ => None,
            })
            .collect();
        let defs: Vec<&'a Subckt> = self
            .ast
            .elems
            .iter()
            .filter_map(|elem| match elem {
                Elem::Subckt(s) => Some(s),
                _ => None,
            })
            .collect();
        self.convert_scope(root, records, &[], &defs)?;
        Ok(Reconstruction {
            schematic: self.sch,
            messages: self.log,
        })
    }

    fn map_subckts(&mut self) {
        for elem in self.ast.elems.iter() {
            if let Elem::Subckt(s) = elem {
                if self.subckts.insert(s.name.clone(), s).is_some() {
                    tracing::warn!(name=%s.name, "duplicate subcircuits: found two subcircuits with the same name; the last one found will be used");
                }
            }
        }
    }

    fn convert_scope(
        &mut self,
        circuit: CircuitId,
        records: Vec<&'a Component>,
        external: &[Node],
        defs: &[&'a Subckt],
    ) -> ConvResult<NetMembership> {
        let mut placer = (self.placer)();
        let mut membership = NetMembership::new();

        // Boundary pins bridge this scope to its parent by pin identity.
        for (i, net) in external.iter().enumerate() {
            let pin = self.sch.add_boundary_pin(circuit, format!("p{}", i + 1));
            self.sch.set_pin_position(pin, placer.next_position());
            self.index.register(pin);
            membership.entry(net.clone()).or_default().push(pin);
        }

        // A dependent source's current sense is a zero-valued voltage source.
        // Absorb each referenced probe into its dependent source instead of
        // materializing it as a standalone component.
        let mut vsources: HashMap<&'a str, (&'a Node, &'a Node)> = HashMap::new();
        for record in records.iter().copied() {
            if let Component::Source(s) = record {
                if s.letter == 'V' {
                    vsources.insert(s.name.as_str(), (&s.pos, &s.neg));
                }
            }
        }
        let mut absorbed: HashSet<&'a str> = HashSet::new();
        for record in records.iter().copied() {
            if let Component::CurrentControlled(cc) = record {
                if vsources.contains_key(cc.probe.as_str()) {
                    absorbed.insert(cc.probe.as_str());
                } else {
                    return Err(ConvError::MissingProbe {
                        record: cc.name.to_string(),
                        probe: cc.probe.to_string(),
                    });
                }
            }
        }

        for record in records.iter().copied() {
            match record {
                Component::Passive(p) => {
                    let kind = devices::kind_for_letter(p.letter)
                        .expect("the parser only accepts known letters");
                    let id = self.add_device(
                        circuit,
                        placer.as_mut(),
                        &mut membership,
                        &p.name,
                        kind,
                        &[("p", &p.pos), ("n", &p.neg)],
                    );
                    self.set_numeric_attr(id, devices::value_attr(p.letter), &p.value)?;
                }
                Component::Source(s) => {
                    if absorbed.contains(s.name.as_str()) {
                        tracing::debug!(name = %s.name, "absorbed probe source");
                        continue;
                    }
                    self.convert_source(circuit, placer.as_mut(), &mut membership, s)?;
                }
                Component::VoltageControlled(vc) => {
                    let kind = devices::kind_for_letter(vc.letter)
                        .expect("the parser only accepts known letters");
                    let id = self.add_device(
                        circuit,
                        placer.as_mut(),
                        &mut membership,
                        &vc.name,
                        kind,
                        &[
                            ("p2", &vc.pos),
                            ("n2", &vc.neg),
                            ("p1", &vc.cpos),
                            ("n1", &vc.cneg),
                        ],
                    );
                    self.set_numeric_attr(id, devices::value_attr(vc.letter), &vc.value)?;
                }
                Component::CurrentControlled(cc) => {
                    let kind = devices::kind_for_letter(cc.letter)
                        .expect("the parser only accepts known letters");
                    let (cpos, cneg) = vsources[cc.probe.as_str()];
                    let id = self.add_device(
                        circuit,
                        placer.as_mut(),
                        &mut membership,
                        &cc.name,
                        kind,
                        &[
                            ("p2", &cc.pos),
                            ("n2", &cc.neg),
                            ("p1", cpos),
                            ("n1", cneg),
                        ],
                    );
                    self.set_numeric_attr(id, devices::value_attr(cc.letter), &cc.value)?;
                }
                Component::Diode(d) => {
                    let kind = devices::kind_for_letter('D')
                        .expect("the parser only accepts known letters");
                    tracing::debug!(model = %d.model, "ignoring diode model reference");
                    self.add_device(
                        circuit,
                        placer.as_mut(),
                        &mut membership,
                        &d.name,
                        kind,
                        &[("p", &d.pos), ("n", &d.neg)],
                    );
                }
                Component::Bjt(q) => {
                    let kind = devices::kind_for_letter('Q')
                        .expect("the parser only accepts known letters");
                    tracing::debug!(model = %q.model, "ignoring BJT model reference");
                    self.add_device(
                        circuit,
                        placer.as_mut(),
                        &mut membership,
                        &q.name,
                        kind,
                        &[
                            ("C", &q.collector),
                            ("B", &q.base),
                            ("E", &q.emitter),
                        ],
                    );
                }
                Component::Mos(m) => {
                    let kind = devices::kind_for_letter('M')
                        .expect("the parser only accepts known letters");
                    tracing::debug!(model = %m.model, "ignoring MOSFET model reference");
                    self.add_device(
                        circuit,
                        placer.as_mut(),
                        &mut membership,
                        &m.name,
                        kind,
                        &[("D", &m.d), ("G", &m.g), ("S", &m.s), ("B", &m.b)],
                    );
                }
                Component::Instance(inst) => {
                    // Each instance is its own circuit node with boundary
                    // pins only; the definition's interior is reconstructed
                    // separately, so instances never share internal nets.
                    let child = self.sch.add_circuit(circuit, inst.name.as_str());
                    self.sch.set_circuit_position(child, placer.next_position());
                    for (i, net) in inst.ports.iter().enumerate() {
                        let pin = self.sch.add_boundary_pin(child, format!("p{}", i + 1));
                        self.sch.set_pin_position(pin, placer.next_position());
                        self.index.register(pin);
                        membership.entry(net.clone()).or_default().push(pin);
                    }
                    if !self.subckts.contains_key(&inst.child) {
                        self.log.warning(
                            child,
                            format!("no definition for subcircuit `{}`", inst.child),
                        );
                    }
                }
            }
        }

        // One shared ground component per scope that references the ground
        // net.
        if membership.contains_key(GROUND_LABEL.as_str()) {
            let gnd = self
                .sch
                .add_component(circuit, "GND", DeviceKind::Ground);
            self.sch.set_component_position(gnd, placer.next_position());
            let pin = self
                .sch
                .component_pin(gnd, "p")
                .expect("ground declares pin `p`");
            self.index.register(pin);
            if let Some(pins) = membership.get_mut(GROUND_LABEL.as_str()) {
                pins.push(pin);
            }
        }

        // Reconstruct definitions, then merge their net membership upward
        // for nets this scope also uses, so wiring below can bridge into the
        // child scopes by pin identity.
        for def in defs {
            let child = self.sch.add_circuit(circuit, def.name.as_str());
            self.sch.set_circuit_position(child, placer.next_position());
            let child_records: Vec<&'a Component> = def.components.iter().collect();
            let child_membership = self.convert_scope(child, child_records, &def.ports, &[])?;
            for (net, pins) in child_membership {
                if let Some(list) = membership.get_mut(&net) {
                    list.extend(pins);
                }
            }
        }

        // Wire synthesis: connect each net's pins, skipping pairs the
        // equivalence index already knows to be connected.
        for (net, pins) in membership.iter() {
            for (a, b) in pins.iter().copied().tuple_combinations() {
                if !self.index.connected(a, b) {
                    let wire = self.sch.add_wire(circuit, a, b);
                    self.index.connect(a, b);
                    tracing::debug!(%wire, net = %net, "added wire");
                }
            }
        }

        Ok(membership)
    }

    fn convert_source(
        &mut self,
        circuit: CircuitId,
        placer: &mut dyn Placer,
        membership: &mut NetMembership,
        source: &super::Source,
    ) -> ConvResult<()> {
        use super::SourceValue;
        match &source.value {
            SourceValue::Dc(value) => {
                let kind = devices::kind_for_letter(source.letter)
                    .expect("the parser only accepts known letters");
                let id = self.add_device(
                    circuit,
                    placer,
                    membership,
                    &source.name,
                    kind,
                    &[("p", &source.pos), ("n", &source.neg)],
                );
                self.set_numeric_attr(id, devices::value_attr(source.letter), value)?;
            }
            SourceValue::Waveform { shape, params } => {
                let kind = devices::kind_for_waveform(source.letter, shape)
                    .ok_or_else(|| ConvError::UnknownWaveform(shape.clone()))?;
                let id = self.add_device(
                    circuit,
                    placer,
                    membership,
                    &source.name,
                    kind,
                    &[("p", &source.pos), ("n", &source.neg)],
                );
                for (key, value) in params.iter() {
                    let value = match numeric_lit(value) {
                        Some(number) => AttrValue::Numeric(number),
                        None => AttrValue::String(value.as_str().into()),
                    };
                    self.sch.set_attr(id, key.as_str(), value);
                }
            }
            SourceValue::Pwl { points, params } => {
                let kind = devices::kind_for_waveform(source.letter, "PWL")
                    .expect("PWL has a kind for both source letters");
                let id = self.add_device(
                    circuit,
                    placer,
                    membership,
                    &source.name,
                    kind,
                    &[("p", &source.pos), ("n", &source.neg)],
                );
                let points = points
                    .iter()
                    .map(|(a, b)| {
                        let a = numeric_lit(a).ok_or_else(|| ConvError::InvalidLiteral(a.clone()))?;
                        let b = numeric_lit(b).ok_or_else(|| ConvError::InvalidLiteral(b.clone()))?;
                        Ok((a, b))
                    })
                    .collect::<ConvResult<Vec<_>>>()?;
                self.sch
                    .set_attr(id, "values", devices::format_pwl_literal(&points));
                for (key, value) in params.iter() {
                    let value = match numeric_lit(value) {
                        Some(number) => AttrValue::Numeric(number),
                        None => AttrValue::String(value.as_str().into()),
                    };
                    self.sch.set_attr(id, key.as_str(), value);
                }
            }
        }
        Ok(())
    }

    fn add_device(
        &mut self,
        circuit: CircuitId,
        placer: &mut dyn Placer,
        membership: &mut NetMembership,
        name: &Substr,
        kind: DeviceKind,
        bindings: &[(&'static str, &Node)],
    ) -> ComponentId {
        let id = self.sch.add_component(circuit, name.as_str(), kind);
        self.sch.set_component_position(id, placer.next_position());
        for (pin_name, net) in bindings {
            let pin = self
                .sch
                .component_pin(id, pin_name)
                .expect("the kind declares this terminal");
            self.index.register(pin);
            membership.entry((*net).clone()).or_default().push(pin);
        }
        tracing::debug!(component = %name, ?kind, "added component");
        id
    }

    fn set_numeric_attr(
        &mut self,
        component: ComponentId,
        attr: &'static str,
        value: &Substr,
    ) -> ConvResult<()> {
        let number = numeric_lit(value).ok_or_else(|| ConvError::InvalidLiteral(value.clone()))?;
        self.sch.set_attr(component, attr, number);
        Ok(())
    }
}

pub(crate) fn numeric_lit(s: &Substr) -> Option<Decimal> {
    s.parse().ok()
}
