//! SPICE netlist bridge for circuit graphs.
//!
//! The forward path resolves the pin topology of a [`Schematic`] into nets
//! (see [`topology`]) and emits one device record per component, bottom-up
//! through nested sub-circuits. The reverse path (see [`parser`]) parses
//! netlist text and reconstructs an equivalent schematic, deduplicating
//! wires through the same equivalence machinery.
//!
//! All counters and intermediate state are owned by one conversion
//! invocation; converting twice, or converting two schematics concurrently,
//! shares nothing.
#![warn(missing_docs)]

use std::collections::HashMap;
use std::io::{prelude::*, BufWriter};

use arcstr::ArcStr;
use cirgraph::diagnostics::NodeRef;
use cirgraph::{CircuitId, ComponentId, DeviceKind, Schematic, WireId};
use rust_decimal::Decimal;
use thiserror::Error;

mod devices;
pub mod parser;
pub mod topology;

#[cfg(test)]
mod tests;

use devices::DeviceClass;
use topology::NetLabels;

/// The reserved label of the ground net. Never minted for any other net.
pub static GROUND_LABEL: ArcStr = arcstr::literal!("0");

/// An error arising while emitting a netlist from a schematic.
///
/// Every variant is fatal to the conversion it occurred in: no partial
/// netlist should be committed once one is returned.
#[derive(Debug, Error)]
pub enum EmitError {
    /// A wire endpoint did not resolve to a pin.
    #[error("wire endpoint does not resolve ({wire})")]
    MissingWireEndpoint {
        /// The offending wire.
        wire: WireId,
    },
    /// A component's kind is in the deny list and cannot be netlisted.
    #[error("device kind {kind:?} cannot be netlisted ({component})")]
    UnsupportedDevice {
        /// The offending kind.
        kind: DeviceKind,
        /// The offending component.
        component: ComponentId,
    },
    /// A component is missing the attribute its record derives its value from.
    #[error("component {component} is missing required attribute `{attr}`")]
    MissingValue {
        /// The offending component.
        component: ComponentId,
        /// The missing attribute.
        attr: &'static str,
    },
    /// A component attribute is present but has no usable numeric value.
    #[error("component {component} has an invalid value for `{attr}`")]
    InvalidValue {
        /// The offending component.
        component: ComponentId,
        /// The offending attribute.
        attr: &'static str,
    },
    /// A component is missing a terminal its record shape requires.
    #[error("component {component} is missing terminal `{name}`")]
    MissingTerminal {
        /// The offending component.
        component: ComponentId,
        /// The missing terminal name.
        name: &'static str,
    },
    /// A piecewise-linear value list failed to validate.
    #[error("invalid piecewise-linear values on {component}: {reason}")]
    InvalidPwl {
        /// The offending component.
        component: ComponentId,
        /// Why validation failed.
        reason: String,
    },
    /// An I/O error from the output stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EmitError {
    /// The graph node this error should be attached to, if one can be
    /// identified.
    pub fn node(&self) -> Option<NodeRef> {
        match self {
            Self::MissingWireEndpoint { wire } => Some(NodeRef::Wire(*wire)),
            Self::UnsupportedDevice { component, .. }
            | Self::MissingValue { component, .. }
            | Self::InvalidValue { component, .. }
            | Self::MissingTerminal { component, .. }
            | Self::InvalidPwl { component, .. } => Some(NodeRef::Component(*component)),
            Self::Io(_) => None,
        }
    }
}

/// A netlister for circuit schematics.
///
/// Writes into the given output stream. Callers that need an all-or-nothing
/// artifact should export into a buffer and only persist it on success; see
/// [`export_netlist`].
pub struct Netlister<'a, W: Write> {
    sch: &'a Schematic,
    out: BufWriter<&'a mut W>,
    counters: HashMap<char, u64>,
}

/// Exports the given schematic as a netlist string.
///
/// Nothing is returned unless the whole conversion succeeded, so the result
/// is safe to persist as an artifact.
pub fn export_netlist(sch: &Schematic) -> Result<String, EmitError> {
    let mut buf = Vec::new();
    Netlister::new(sch, &mut buf).export()?;
    // The netlister only ever writes UTF-8.
    Ok(String::from_utf8(buf).expect("netlist output should be UTF-8"))
}

impl<'a, W: Write> Netlister<'a, W> {
    /// Creates a new netlister writing to the given output stream.
    pub fn new(sch: &'a Schematic, out: &'a mut W) -> Self {
        Self {
            sch,
            out: BufWriter::new(out),
            counters: HashMap::new(),
        }
    }

    /// Exports this netlister's schematic to its output stream.
    ///
    /// Resolves the net partition first, then emits nested circuits as
    /// `.SUBCKT` blocks (children before parents) followed by the root
    /// scope's records.
    pub fn export(mut self) -> Result<(), EmitError> {
        let root = self.sch.root();
        let span = tracing::debug_span!("netlist", circuit = %self.sch.circuit(root).name());
        let _guard = span.enter();

        let mut index = topology::build_partition(self.sch, root)?;
        let labels = NetLabels::assign(&mut index);
        tracing::debug!(nets = labels.num_nets(), "assigned net labels");

        writeln!(self.out, "* {}", self.sch.circuit(root).name())?;
        writeln!(self.out)?;
        self.export_subckts(root, &labels)?;
        self.export_records(root, &labels)?;
        self.out.flush()?;
        Ok(())
    }

    /// Emits `.SUBCKT` blocks for every circuit nested under `id`, deepest
    /// first, so a definition always precedes its use.
    fn export_subckts(&mut self, id: CircuitId, labels: &NetLabels) -> Result<(), EmitError> {
        let sch = self.sch;
        for child in sch.circuit(id).children() {
            self.export_subckts(child, labels)?;
            let circuit = sch.circuit(child);
            write!(self.out, ".SUBCKT {}", circuit.name())?;
            for pin in circuit.exposed() {
                let label = labels
                    .try_label(pin)
                    .expect("boundary pins are registered during partitioning");
                write!(self.out, " {}", label)?;
            }
            writeln!(self.out)?;
            self.export_records(child, labels)?;
            writeln!(self.out, ".ENDS {}", circuit.name())?;
            writeln!(self.out)?;
        }
        Ok(())
    }

    /// Emits one record per device component of the given circuit, then one
    /// `X` instance record per child circuit.
    fn export_records(&mut self, id: CircuitId, labels: &NetLabels) -> Result<(), EmitError> {
        let sch = self.sch;
        for component_id in sch.circuit(id).components() {
            let component = sch.component(component_id);
            match devices::class_for(component.kind()) {
                DeviceClass::Structural => continue,
                DeviceClass::Denied => {
                    return Err(EmitError::UnsupportedDevice {
                        kind: component.kind(),
                        component: component_id,
                    });
                }
                DeviceClass::Passive {
                    letter,
                    attr,
                    reciprocal,
                } => {
                    let value = numeric_attr(sch, component_id, attr)?;
                    let value = if reciprocal {
                        Decimal::ONE
                            .checked_div(value)
                            .ok_or(EmitError::InvalidValue {
                                component: component_id,
                                attr,
                            })?
                    } else {
                        value
                    };
                    let name = self.next_label(letter);
                    let pos = terminal_label(sch, labels, component_id, "p")?;
                    let neg = terminal_label(sch, labels, component_id, "n")?;
                    writeln!(self.out, "{name} {pos} {neg} {value}")?;
                }
                DeviceClass::VoltageControlled { letter, attr } => {
                    let value = numeric_attr(sch, component_id, attr)?;
                    let name = self.next_label(letter);
                    let pos = terminal_label(sch, labels, component_id, "p2")?;
                    let neg = terminal_label(sch, labels, component_id, "n2")?;
                    let cpos = terminal_label(sch, labels, component_id, "p1")?;
                    let cneg = terminal_label(sch, labels, component_id, "n1")?;
                    writeln!(self.out, "{name} {pos} {neg} {cpos} {cneg} {value}")?;
                }
                DeviceClass::CurrentControlled { letter, attr } => {
                    let value = numeric_attr(sch, component_id, attr)?;
                    // The control branch is sensed through an auxiliary
                    // zero-valued voltage source spanning the control pins.
                    let probe = self.next_label('V');
                    let cpos = terminal_label(sch, labels, component_id, "p1")?;
                    let cneg = terminal_label(sch, labels, component_id, "n1")?;
                    writeln!(self.out, "{probe} {cpos} {cneg} 0")?;
                    let name = self.next_label(letter);
                    let pos = terminal_label(sch, labels, component_id, "p2")?;
                    let neg = terminal_label(sch, labels, component_id, "n2")?;
                    writeln!(self.out, "{name} {pos} {neg} {probe} {value}")?;
                }
                DeviceClass::Waveform { letter, shape, pwl } => {
                    let name = self.next_label(letter);
                    let pos = terminal_label(sch, labels, component_id, "p")?;
                    let neg = terminal_label(sch, labels, component_id, "n")?;
                    write!(self.out, "{name} {pos} {neg} {shape}")?;
                    if pwl {
                        let values =
                            component
                                .attr("values")
                                .ok_or(EmitError::MissingValue {
                                    component: component_id,
                                    attr: "values",
                                })?;
                        let points = devices::parse_pwl_literal(&values.to_string())
                            .map_err(|reason| EmitError::InvalidPwl {
                                component: component_id,
                                reason,
                            })?;
                        for (time, value) in points {
                            write!(self.out, " {time} {value}")?;
                        }
                        for (key, value) in component.attrs() {
                            if key != "values" {
                                write!(self.out, " {key}={value}")?;
                            }
                        }
                    } else {
                        // The declared attribute set is forwarded verbatim,
                        // in declaration order.
                        for (key, value) in component.attrs() {
                            write!(self.out, " {key}={value}")?;
                        }
                    }
                    writeln!(self.out)?;
                }
                DeviceClass::Semiconductor {
                    letter,
                    model,
                    terminals,
                } => {
                    let name = self.next_label(letter);
                    write!(self.out, "{name}")?;
                    for terminal in terminals.iter().copied() {
                        let label = terminal_label(sch, labels, component_id, terminal)?;
                        write!(self.out, " {label}")?;
                    }
                    writeln!(self.out, " {model}")?;
                }
            }
        }

        for child in sch.circuit(id).children() {
            let circuit = sch.circuit(child);
            let name = self.next_label('X');
            write!(self.out, "{name}")?;
            for pin in circuit.exposed() {
                let label = labels
                    .try_label(pin)
                    .expect("boundary pins are registered during partitioning");
                write!(self.out, " {}", label)?;
            }
            writeln!(self.out, " {}", circuit.name())?;
        }

        Ok(())
    }

    /// Mints the next device label for a letter class. Counters are unique
    /// within one letter class for the duration of this conversion.
    fn next_label(&mut self, letter: char) -> String {
        let counter = self.counters.entry(letter).or_insert(0);
        *counter += 1;
        format!("{letter}{counter}")
    }
}

fn terminal_label<'l>(
    sch: &Schematic,
    labels: &'l NetLabels,
    component: ComponentId,
    name: &'static str,
) -> Result<&'l ArcStr, EmitError> {
    let pin = sch
        .component_pin(component, name)
        .ok_or(EmitError::MissingTerminal { component, name })?;
    labels
        .try_label(pin)
        .ok_or(EmitError::MissingTerminal { component, name })
}

fn numeric_attr(
    sch: &Schematic,
    component: ComponentId,
    attr: &'static str,
) -> Result<Decimal, EmitError> {
    sch.component(component)
        .attr(attr)
        .ok_or(EmitError::MissingValue { component, attr })?
        .as_numeric()
        .ok_or(EmitError::InvalidValue { component, attr })
}
