//! The device-kind enumeration.
//!
//! Every component in a schematic carries exactly one [`DeviceKind`] tag.
//! Classification questions ("is this a junction?", "how many terminals does
//! this device declare?") are answered by matching on the tag once, rather
//! than by chains of per-type checks.

use serde::{Deserialize, Serialize};

/// The electrical kind of a schematic component.
///
/// Structural markers ([`Junction`](DeviceKind::Junction),
/// [`Ground`](DeviceKind::Ground)) participate in topology resolution but
/// never produce netlist records. Kinds in the deny list (see
/// [`DeviceKind::is_denied`]) exist in the graph model but cannot be
/// netlisted.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// An ideal resistor, valued by its `R` attribute (Ohms).
    Resistor,
    /// A resistor expressed as a conductance (`G` attribute, Siemens).
    Conductor,
    /// An ideal capacitor.
    Capacitor,
    /// An ideal inductor.
    Inductor,
    /// An independent DC voltage source.
    Voltage,
    /// An independent DC current source.
    Current,
    /// A voltage-controlled voltage source.
    Vcv,
    /// A voltage-controlled current source.
    Vcc,
    /// A current-controlled current source.
    Ccc,
    /// A current-controlled voltage source.
    Ccv,
    /// A pulse voltage source.
    PulseVoltage,
    /// A pulse current source.
    PulseCurrent,
    /// A sinusoidal voltage source.
    SinVoltage,
    /// A sinusoidal current source.
    SinCurrent,
    /// An exponential voltage source.
    ExpVoltage,
    /// An exponential current source.
    ExpCurrent,
    /// A piecewise-linear voltage source.
    PwlVoltage,
    /// A piecewise-linear current source.
    PwlCurrent,
    /// A random voltage source.
    RandomVoltage,
    /// A random current source.
    RandomCurrent,
    /// An amplitude-modulated voltage source.
    AmVoltage,
    /// An amplitude-modulated current source.
    AmCurrent,
    /// A single-frequency FM voltage source.
    SffmVoltage,
    /// A single-frequency FM current source.
    SffmCurrent,
    /// An AC power-line voltage source.
    AcLine,
    /// A junction diode.
    Diode,
    /// A light-emitting diode.
    Led,
    /// A Schottky diode.
    Schottky,
    /// A Zener diode.
    Zener,
    /// An NPN bipolar junction transistor.
    Npn,
    /// A PNP bipolar junction transistor.
    Pnp,
    /// An N-channel MOSFET.
    Nmos,
    /// A P-channel MOSFET.
    Pmos,
    /// An N-way electrical short between all of its pins.
    Junction,
    /// The ground marker. Pins of a ground component are forced onto the
    /// reserved net label.
    Ground,
    /// A variable resistor. Not netlistable.
    VariableResistor,
    /// A variable conductor. Not netlistable.
    VariableConductor,
    /// A variable capacitor. Not netlistable.
    VariableCapacitor,
    /// A variable inductor. Not netlistable.
    VariableInductor,
    /// A saturating inductor. Not netlistable.
    SaturatingInductor,
    /// An ideal operational amplifier. Not netlistable.
    OpAmp,
    /// A detailed operational amplifier model. Not netlistable.
    OpAmpDetailed,
    /// A gyrator. Not netlistable.
    Gyrator,
    /// A potentiometer. Not netlistable.
    Potentiometer,
    /// A transformer. Not netlistable.
    Transformer,
}

impl DeviceKind {
    /// The terminal names this kind declares, in order.
    ///
    /// Junctions declare no fixed terminals; their pins are added
    /// individually. The deny-listed kinds still declare plausible pin sets
    /// so that schematics containing them remain well-formed graphs.
    pub fn pins(&self) -> &'static [&'static str] {
        use DeviceKind::*;
        match self {
            Resistor | Conductor | Capacitor | Inductor | Voltage | Current | PulseVoltage
            | PulseCurrent | SinVoltage | SinCurrent | ExpVoltage | ExpCurrent | PwlVoltage
            | PwlCurrent | RandomVoltage | RandomCurrent | AmVoltage | AmCurrent | SffmVoltage
            | SffmCurrent | AcLine | Diode | Led | Schottky | Zener => &["p", "n"],
            Vcv | Vcc | Ccc | Ccv => &["p1", "n1", "p2", "n2"],
            Npn | Pnp => &["C", "B", "E"],
            Nmos | Pmos => &["D", "G", "S", "B"],
            Junction => &[],
            Ground => &["p"],
            VariableResistor | VariableConductor | VariableCapacitor | VariableInductor
            | SaturatingInductor => &["p", "n"],
            OpAmp => &["in_p", "in_n", "out"],
            OpAmpDetailed => &["in_p", "in_n", "out", "vdd", "vss"],
            Gyrator | Transformer => &["p1", "n1", "p2", "n2"],
            Potentiometer => &["p", "n", "w"],
        }
    }

    /// Returns `true` for the junction marker.
    #[inline]
    pub fn is_junction(&self) -> bool {
        matches!(self, Self::Junction)
    }

    /// Returns `true` for the ground marker.
    #[inline]
    pub fn is_ground(&self) -> bool {
        matches!(self, Self::Ground)
    }

    /// Returns `true` for kinds that shape the topology but are not devices
    /// (junctions and grounds).
    #[inline]
    pub fn is_structural(&self) -> bool {
        self.is_junction() || self.is_ground()
    }

    /// Returns `true` for kinds that cannot be expressed as netlist records.
    pub fn is_denied(&self) -> bool {
        use DeviceKind::*;
        matches!(
            self,
            VariableResistor
                | VariableConductor
                | VariableCapacitor
                | VariableInductor
                | SaturatingInductor
                | OpAmp
                | OpAmpDetailed
                | Gyrator
                | Potentiometer
                | Transformer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_counts() {
        assert_eq!(DeviceKind::Resistor.pins().len(), 2);
        assert_eq!(DeviceKind::Ccc.pins().len(), 4);
        assert_eq!(DeviceKind::Npn.pins().len(), 3);
        assert_eq!(DeviceKind::Nmos.pins().len(), 4);
        assert!(DeviceKind::Junction.pins().is_empty());
    }

    #[test]
    fn deny_list_is_not_structural() {
        assert!(DeviceKind::Gyrator.is_denied());
        assert!(!DeviceKind::Gyrator.is_structural());
        assert!(DeviceKind::Junction.is_structural());
        assert!(!DeviceKind::Junction.is_denied());
    }
}
