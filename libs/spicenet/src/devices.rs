//! The device table.
//!
//! One fixed table maps each [`DeviceKind`] to its netlist record shape:
//! letter class, terminal order, and how the record's value is derived from
//! component attributes. The reverse tables map record letters and waveform
//! shapes back to graph kinds. Letters with more than one candidate kind
//! always resolve to the first listed candidate; true polarity is not
//! recoverable from netlist text.

use cirgraph::DeviceKind;
use rust_decimal::Decimal;

/// How a device kind maps onto a netlist record.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum DeviceClass {
    /// A two-terminal record with a numeric value.
    Passive {
        /// The record letter.
        letter: char,
        /// The attribute holding the value.
        attr: &'static str,
        /// Whether the attribute is the reciprocal of the emitted value.
        reciprocal: bool,
    },
    /// A four-terminal record with directly sensed control nodes (E/G).
    VoltageControlled { letter: char, attr: &'static str },
    /// A record sensing current through a synthesized probe source (F/H).
    CurrentControlled { letter: char, attr: &'static str },
    /// A two-terminal source with a waveform shape and named parameters.
    Waveform {
        letter: char,
        shape: &'static str,
        /// Piecewise-linear sources carry a literal list of pairs instead of
        /// named parameters.
        pwl: bool,
    },
    /// A semiconductor record with a placeholder model reference.
    Semiconductor {
        letter: char,
        model: &'static str,
        terminals: &'static [&'static str],
    },
    /// Shapes the topology, produces no record.
    Structural,
    /// Cannot be netlisted; fatal to the conversion.
    Denied,
}

pub(crate) fn class_for(kind: DeviceKind) -> DeviceClass {
    use DeviceKind::*;
    match kind {
        Resistor => DeviceClass::Passive {
            letter: 'R',
            attr: "R",
            reciprocal: false,
        },
        Conductor => DeviceClass::Passive {
            letter: 'R',
            attr: "G",
            reciprocal: true,
        },
        Capacitor => DeviceClass::Passive {
            letter: 'C',
            attr: "C",
            reciprocal: false,
        },
        Inductor => DeviceClass::Passive {
            letter: 'L',
            attr: "L",
            reciprocal: false,
        },
        Voltage => DeviceClass::Passive {
            letter: 'V',
            attr: "V",
            reciprocal: false,
        },
        Current => DeviceClass::Passive {
            letter: 'I',
            attr: "I",
            reciprocal: false,
        },
        Vcv => DeviceClass::VoltageControlled {
            letter: 'E',
            attr: "gain",
        },
        Vcc => DeviceClass::VoltageControlled {
            letter: 'G',
            attr: "transconductance",
        },
        Ccc => DeviceClass::CurrentControlled {
            letter: 'F',
            attr: "gain",
        },
        Ccv => DeviceClass::CurrentControlled {
            letter: 'H',
            attr: "transresistance",
        },
        PulseVoltage => waveform('V', "PULSE"),
        PulseCurrent => waveform('I', "PULSE"),
        SinVoltage => waveform('V', "SIN"),
        SinCurrent => waveform('I', "SIN"),
        ExpVoltage => waveform('V', "EXP"),
        ExpCurrent => waveform('I', "EXP"),
        PwlVoltage => DeviceClass::Waveform {
            letter: 'V',
            shape: "PWL",
            pwl: true,
        },
        PwlCurrent => DeviceClass::Waveform {
            letter: 'I',
            shape: "PWL",
            pwl: true,
        },
        RandomVoltage => waveform('V', "TRRANDOM"),
        RandomCurrent => waveform('I', "TRRANDOM"),
        AmVoltage => waveform('V', "AM"),
        AmCurrent => waveform('I', "AM"),
        SffmVoltage => waveform('V', "SFFM"),
        SffmCurrent => waveform('I', "SFFM"),
        AcLine => waveform('V', "ACLINE"),
        Diode | Led | Schottky | Zener => DeviceClass::Semiconductor {
            letter: 'D',
            model: "DMOD",
            terminals: &["p", "n"],
        },
        Npn | Pnp => DeviceClass::Semiconductor {
            letter: 'Q',
            model: "QMOD",
            terminals: &["C", "B", "E"],
        },
        Nmos | Pmos => DeviceClass::Semiconductor {
            letter: 'M',
            model: "MMOD",
            terminals: &["D", "G", "S", "B"],
        },
        Junction | Ground => DeviceClass::Structural,
        VariableResistor | VariableConductor | VariableCapacitor | VariableInductor
        | SaturatingInductor | OpAmp | OpAmpDetailed | Gyrator | Potentiometer | Transformer => {
            DeviceClass::Denied
        }
    }
}

fn waveform(letter: char, shape: &'static str) -> DeviceClass {
    DeviceClass::Waveform {
        letter,
        shape,
        pwl: false,
    }
}

/// Candidate graph kinds for a record letter, most common first.
pub(crate) fn kinds_for_letter(letter: char) -> &'static [DeviceKind] {
    use DeviceKind::*;
    match letter.to_ascii_uppercase() {
        'R' => &[Resistor],
        'L' => &[Inductor],
        'C' => &[Capacitor],
        'V' => &[Voltage],
        'I' => &[Current],
        'E' => &[Vcv],
        'G' => &[Vcc],
        'F' => &[Ccc],
        'H' => &[Ccv],
        'D' => &[Diode, Led, Schottky, Zener],
        'Q' => &[Npn, Pnp],
        'M' => &[Nmos, Pmos],
        _ => &[],
    }
}

/// Resolves a record letter to a graph kind, taking the first candidate.
pub(crate) fn kind_for_letter(letter: char) -> Option<DeviceKind> {
    let candidates = kinds_for_letter(letter);
    let kind = candidates.first().copied();
    if candidates.len() > 1 {
        tracing::debug!(
            %letter,
            ?kind,
            "ambiguous device letter; taking the first candidate"
        );
    }
    kind
}

/// Resolves a waveform shape keyword to a graph kind.
pub(crate) fn kind_for_waveform(letter: char, shape: &str) -> Option<DeviceKind> {
    use DeviceKind::*;
    let voltage = letter.to_ascii_uppercase() == 'V';
    match shape.to_ascii_uppercase().as_str() {
        "PULSE" => Some(if voltage { PulseVoltage } else { PulseCurrent }),
        "SIN" => Some(if voltage { SinVoltage } else { SinCurrent }),
        "EXP" => Some(if voltage { ExpVoltage } else { ExpCurrent }),
        "PWL" => Some(if voltage { PwlVoltage } else { PwlCurrent }),
        "TRRANDOM" => Some(if voltage { RandomVoltage } else { RandomCurrent }),
        "AM" => Some(if voltage { AmVoltage } else { AmCurrent }),
        "SFFM" => Some(if voltage { SffmVoltage } else { SffmCurrent }),
        "ACLINE" if voltage => Some(AcLine),
        _ => None,
    }
}

/// The attribute that carries the value of a two-terminal record, per letter.
pub(crate) fn value_attr(letter: char) -> &'static str {
    match letter.to_ascii_uppercase() {
        'R' => "R",
        'L' => "L",
        'C' => "C",
        'V' => "V",
        'I' => "I",
        'E' => "gain",
        'G' => "transconductance",
        'F' => "gain",
        'H' => "transresistance",
        _ => "value",
    }
}

/// Parses a literal list of coordinate pairs, e.g. `[(0, 0), (1, 2.5)]`.
///
/// Every coordinate must be numeric; the reason string names the first
/// offending token.
pub(crate) fn parse_pwl_literal(s: &str) -> Result<Vec<(Decimal, Decimal)>, String> {
    let inner = s
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| "expected a bracketed list of pairs".to_string())?;

    let mut points = Vec::new();
    let mut rest = inner.trim();
    while !rest.is_empty() {
        rest = rest
            .strip_prefix('(')
            .ok_or_else(|| format!("expected `(` at `{rest}`"))?;
        let end = rest
            .find(')')
            .ok_or_else(|| "unterminated coordinate pair".to_string())?;
        let body = &rest[..end];
        let (a, b) = body
            .split_once(',')
            .ok_or_else(|| format!("pair `({body})` must have two coordinates"))?;
        let a: Decimal = a
            .trim()
            .parse()
            .map_err(|_| format!("non-numeric coordinate `{}`", a.trim()))?;
        let b: Decimal = b
            .trim()
            .parse()
            .map_err(|_| format!("non-numeric coordinate `{}`", b.trim()))?;
        points.push((a, b));
        rest = rest[end + 1..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }

    if points.is_empty() {
        return Err("expected at least one coordinate pair".to_string());
    }
    Ok(points)
}

/// Formats coordinate pairs back into the literal list representation.
pub(crate) fn format_pwl_literal(points: &[(Decimal, Decimal)]) -> String {
    let inner = points
        .iter()
        .map(|(a, b)| format!("({a}, {b})"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{inner}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn first_candidate_wins() {
        assert_eq!(kind_for_letter('M'), Some(DeviceKind::Nmos));
        assert_eq!(kind_for_letter('Q'), Some(DeviceKind::Npn));
        assert_eq!(kind_for_letter('D'), Some(DeviceKind::Diode));
        assert_eq!(kind_for_letter('Z'), None);
    }

    #[test]
    fn pwl_literal_round_trip() {
        let points = parse_pwl_literal("[(0, 0), (1, 2.5)]").unwrap();
        assert_eq!(points, vec![(dec!(0), dec!(0)), (dec!(1), dec!(2.5))]);
        assert_eq!(format_pwl_literal(&points), "[(0, 0), (1, 2.5)]");
    }

    #[test]
    fn pwl_literal_rejects_non_numeric_pairs() {
        let err = parse_pwl_literal("[(0, a)]").unwrap_err();
        assert!(err.contains("non-numeric"));
        assert!(parse_pwl_literal("0, 0").is_err());
        assert!(parse_pwl_literal("[]").is_err());
        assert!(parse_pwl_literal("[(0)]").is_err());
    }
}
