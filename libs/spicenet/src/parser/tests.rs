use test_log::test;

use super::*;

pub const NETLIST_RESISTOR: &str = r#"
.subckt my_resistor p n
R1 p n 100
.ends
"#;

pub const NETLIST_MIXED: &str = r#"* mixed devices
V1 in 0 5
R1 in out 1000
C1 out 0 0.000001
E1 a b in out 10
V2 sense 0 0
F1 x y V2 2
M1 d g s b MMOD
X1 a b my_amp gain=3
"#;

#[test]
fn resistor_tokens() {
    let tok = Tokenizer::new(NETLIST_RESISTOR);
    let toks = tok.into_iter().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(
        toks,
        vec![
            Token::Directive(Substr(".subckt".into())),
            Token::Ident(Substr("my_resistor".into())),
            Token::Ident(Substr("p".into())),
            Token::Ident(Substr("n".into())),
            Token::LineEnd,
            Token::Ident(Substr("R1".into())),
            Token::Ident(Substr("p".into())),
            Token::Ident(Substr("n".into())),
            Token::Ident(Substr("100".into())),
            Token::LineEnd,
            Token::Directive(Substr(".ends".into())),
            Token::LineEnd,
        ]
    );
}

#[test]
fn line_continuations_extend_the_logical_line() {
    let parsed = Parser::parse("* title\nR1 a\n+ b 42\n").unwrap();
    assert_eq!(parsed.ast.elems.len(), 1);
    match &parsed.ast.elems[0] {
        Elem::Component(Component::Passive(r)) => {
            assert_eq!(r.name, "R1".into());
            assert_eq!(r.pos, "a".into());
            assert_eq!(r.neg, "b".into());
            assert_eq!(r.value, "42".into());
        }
        other => panic!("expected a passive record, got {other:?}"),
    }
}

#[test]
fn parse_subckt() {
    let parsed = Parser::parse(NETLIST_RESISTOR).unwrap();
    assert_eq!(parsed.ast.elems.len(), 1);
    match &parsed.ast.elems[0] {
        Elem::Subckt(Subckt {
            name,
            ports,
            components,
        }) => {
            assert_eq!(*name, "my_resistor".into());
            assert_eq!(*ports, vec!["p".into(), "n".into()]);
            assert_eq!(components.len(), 1);
        }
        _ => panic!("expected a subcircuit"),
    }
}

#[test]
fn parse_mixed_devices() {
    let parsed = Parser::parse(NETLIST_MIXED).unwrap();
    assert_eq!(parsed.name, "mixed devices");
    assert_eq!(parsed.ast.elems.len(), 8);

    match &parsed.ast.elems[0] {
        Elem::Component(Component::Source(s)) => {
            assert_eq!(s.letter, 'V');
            assert_eq!(s.value, SourceValue::Dc("5".into()));
        }
        other => panic!("expected a source, got {other:?}"),
    }

    match &parsed.ast.elems[3] {
        Elem::Component(Component::VoltageControlled(e)) => {
            assert_eq!(e.letter, 'E');
            assert_eq!(e.cpos, "in".into());
            assert_eq!(e.cneg, "out".into());
            assert_eq!(e.value, "10".into());
        }
        other => panic!("expected a voltage-controlled source, got {other:?}"),
    }

    match &parsed.ast.elems[5] {
        Elem::Component(Component::CurrentControlled(f)) => {
            assert_eq!(f.letter, 'F');
            assert_eq!(f.probe, "V2".into());
        }
        other => panic!("expected a current-controlled source, got {other:?}"),
    }

    match &parsed.ast.elems[6] {
        Elem::Component(Component::Mos(m)) => {
            assert_eq!(m.g, "g".into());
            assert_eq!(m.model, "MMOD".into());
        }
        other => panic!("expected a MOSFET, got {other:?}"),
    }

    match &parsed.ast.elems[7] {
        Elem::Component(Component::Instance(x)) => {
            assert_eq!(x.child, "my_amp".into());
            assert_eq!(x.ports, vec!["a".into(), "b".into()]);
            assert_eq!(x.params.get("gain"), Some(&"3".into()));
        }
        other => panic!("expected an instance, got {other:?}"),
    }
}

#[test]
fn waveform_params_preserve_order() {
    let parsed =
        Parser::parse("* w\nV1 a 0 PULSE initial_value=0 pulsed_value=5 delay_time=0.001\n")
            .unwrap();
    match &parsed.ast.elems[0] {
        Elem::Component(Component::Source(s)) => match &s.value {
            SourceValue::Waveform { shape, params } => {
                assert_eq!(*shape, "PULSE".into());
                let keys: Vec<_> = params.iter().map(|(k, _)| k.to_string()).collect();
                assert_eq!(keys, vec!["initial_value", "pulsed_value", "delay_time"]);
            }
            other => panic!("expected a waveform, got {other:?}"),
        },
        other => panic!("expected a source, got {other:?}"),
    }
}

#[test]
fn pwl_coordinates_come_in_pairs() {
    let parsed = Parser::parse("* w\nI1 a 0 PWL 0 0 1 5\n").unwrap();
    match &parsed.ast.elems[0] {
        Elem::Component(Component::Source(s)) => match &s.value {
            SourceValue::Pwl { points, params } => {
                assert_eq!(points.len(), 2);
                assert!(params.is_empty());
            }
            other => panic!("expected a PWL source, got {other:?}"),
        },
        other => panic!("expected a source, got {other:?}"),
    }

    let err = Parser::parse("* w\nI1 a 0 PWL 0 0 1\n").unwrap_err();
    assert!(matches!(err, ParserError::InvalidLine { .. }));
}

#[test]
fn unknown_letters_are_rejected() {
    let err = Parser::parse("* w\nW1 a b 5\n").unwrap_err();
    assert!(matches!(err, ParserError::UnexpectedComponentType('W')));
}

#[test]
fn ends_without_subckt_is_rejected() {
    let err = Parser::parse("* w\n.ends\n").unwrap_err();
    assert!(matches!(err, ParserError::UnexpectedLine(_)));
}

#[test]
fn end_directive_is_ignored() {
    let parsed = Parser::parse("* w\nR1 a b 1\n.end\n").unwrap();
    assert_eq!(parsed.ast.elems.len(), 1);
}
