//! SPICE netlist parser.

pub mod conv;
#[cfg(test)]
mod tests;

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt::Display;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use arcstr::ArcStr;
use nom::bytes::complete::{take_till, take_while};
use thiserror::Error;

use indexmap::IndexMap;

/// The type representing nets in a parsed netlist.
pub type Node = Substr;

/// A substring of the text being parsed.
#[derive(Clone, Default, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Substr(arcstr::Substr);

/// Parses SPICE netlists.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Parser {
    buffer: Vec<Token>,
    ast: Ast,
    state: ReaderState,
}

#[derive(Clone, Default, Eq, PartialEq, Debug)]
enum ReaderState {
    #[default]
    Top,
    Subckt(Subckt),
}

impl Parser {
    /// Parse the given file.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedNetlist, ParserError> {
        let path = path.as_ref();
        tracing::debug!("reading netlist file: {:?}", path);
        let s: ArcStr = std::fs::read_to_string(path)
            .map_err(|err| ParserError::FailedToRead {
                path: path.into(),
                err,
            })?
            .into();
        Self::parse_named(arcstr::format!("{}", path.display()), s)
    }

    /// Parse the given string.
    ///
    /// The netlist's name is taken from the first line of the input (a
    /// leading comment marker is trimmed), matching what the netlister
    /// writes.
    pub fn parse(data: impl Into<Substr>) -> Result<ParsedNetlist, ParserError> {
        Self::parse_named(arcstr::literal!("netlist"), data)
    }

    fn parse_named(
        fallback: ArcStr,
        data: impl Into<Substr>,
    ) -> Result<ParsedNetlist, ParserError> {
        let data = data.into();
        let name = match data.lines().next() {
            Some(line) => {
                let trimmed = line.trim_start_matches(['*', '$']).trim();
                if trimmed.is_empty() {
                    fallback
                } else {
                    ArcStr::from(trimmed)
                }
            }
            None => fallback,
        };
        let mut parser = Self::default();
        parser.parse_inner(data)?;
        Ok(ParsedNetlist {
            ast: parser.ast,
            name,
        })
    }

    fn parse_inner(&mut self, data: Substr) -> Result<(), ParserError> {
        let mut tok = Tokenizer::new(data);
        while let Some(line) = self.parse_line(&mut tok)? {
            match (&mut self.state, line) {
                (ReaderState::Top, Line::SubcktDecl { name, ports }) => {
                    self.state = ReaderState::Subckt(Subckt {
                        name,
                        ports,
                        components: vec![],
                    });
                }
                (ReaderState::Top, Line::Component(c)) => {
                    self.ast.elems.push(Elem::Component(c));
                }
                (ReaderState::Subckt(subckt), Line::Component(c)) => {
                    subckt.components.push(c);
                }
                (ReaderState::Subckt(subckt), Line::EndSubckt) => {
                    let subckt = std::mem::take(subckt);
                    self.ast.elems.push(Elem::Subckt(subckt));
                    self.state = ReaderState::Top;
                }
                (_, line) => return Err(ParserError::UnexpectedLine(Box::new(line))),
            }
        }
        Ok(())
    }

    fn parse_line(&mut self, tok: &mut Tokenizer) -> Result<Option<Line>, ParserError> {
        while let Some(token) = tok.get()? {
            if token == Token::LineEnd {
                if let Some(line) = self.parse_line_inner()? {
                    return Ok(Some(line));
                }
            } else {
                self.buffer.push(token);
            }
        }

        Ok(None)
    }

    fn parse_line_inner(&mut self) -> Result<Option<Line>, ParserError> {
        let line = match self.buffer.first().unwrap() {
            Token::Directive(d) => {
                if d.eq_ignore_ascii_case(".subckt") {
                    let name = self.ident(1)?;
                    let ports = self.buffer[2..]
                        .iter()
                        .map(|tok| tok.try_ident().cloned())
                        .collect::<Result<_, _>>()?;
                    Line::SubcktDecl { name, ports }
                } else if d.eq_ignore_ascii_case(".ends") {
                    Line::EndSubckt
                } else if d.eq_ignore_ascii_case(".end") {
                    self.buffer.clear();
                    return Ok(None);
                } else {
                    return Err(ParserError::UnexpectedDirective(d.clone()));
                }
            }
            Token::Ident(id) => {
                let kind = id.chars().next().unwrap().to_ascii_uppercase();

                match kind {
                    'R' | 'L' | 'C' => {
                        self.expect_len(4, "a two-terminal record takes two nets and a value")?;
                        Line::Component(Component::Passive(Passive {
                            letter: kind,
                            name: self.ident(0)?,
                            pos: self.ident(1)?,
                            neg: self.ident(2)?,
                            value: self.ident(3)?,
                        }))
                    }
                    'V' | 'I' => {
                        let value_tok = self.ident(3)?;
                        let value = if conv::numeric_lit(&value_tok).is_some() {
                            self.expect_len(4, "a DC source takes two nets and a value")?;
                            SourceValue::Dc(value_tok)
                        } else if value_tok.eq_ignore_ascii_case("PWL") {
                            let eq = self.buffer.iter().position(|t| matches!(t, Token::Equals));
                            let coord_end = eq.map(|p| p - 1).unwrap_or(self.buffer.len());
                            if coord_end < 4 {
                                return Err(ParserError::InvalidLine {
                                    line: self.buffer.clone(),
                                    reason: "PWL coordinates must precede any parameters"
                                        .to_string(),
                                });
                            }
                            let coords = self.buffer[4..coord_end]
                                .iter()
                                .map(|t| t.try_ident().cloned())
                                .collect::<Result<Vec<_>, _>>()?;
                            if coords.len() % 2 != 0 {
                                return Err(ParserError::InvalidLine {
                                    line: self.buffer.clone(),
                                    reason: "PWL takes an even number of coordinates".to_string(),
                                });
                            }
                            let points = coords
                                .chunks(2)
                                .map(|pair| (pair[0].clone(), pair[1].clone()))
                                .collect();
                            let params = self.parse_params(coord_end)?;
                            SourceValue::Pwl { points, params }
                        } else {
                            SourceValue::Waveform {
                                shape: value_tok,
                                params: self.parse_params(4)?,
                            }
                        };
                        Line::Component(Component::Source(Source {
                            letter: kind,
                            name: self.ident(0)?,
                            pos: self.ident(1)?,
                            neg: self.ident(2)?,
                            value,
                        }))
                    }
                    'E' | 'G' => {
                        self.expect_len(6, "a voltage-controlled source takes four nets and a value")?;
                        Line::Component(Component::VoltageControlled(VoltageControlled {
                            letter: kind,
                            name: self.ident(0)?,
                            pos: self.ident(1)?,
                            neg: self.ident(2)?,
                            cpos: self.ident(3)?,
                            cneg: self.ident(4)?,
                            value: self.ident(5)?,
                        }))
                    }
                    'F' | 'H' => {
                        self.expect_len(
                            5,
                            "a current-controlled source takes two nets, a probe, and a value",
                        )?;
                        Line::Component(Component::CurrentControlled(CurrentControlled {
                            letter: kind,
                            name: self.ident(0)?,
                            pos: self.ident(1)?,
                            neg: self.ident(2)?,
                            probe: self.ident(3)?,
                            value: self.ident(4)?,
                        }))
                    }
                    'D' => Line::Component(Component::Diode(Diode {
                        name: self.ident(0)?,
                        pos: self.ident(1)?,
                        neg: self.ident(2)?,
                        model: self.ident(3)?,
                        params: self.parse_params(4)?,
                    })),
                    'Q' => Line::Component(Component::Bjt(Bjt {
                        name: self.ident(0)?,
                        collector: self.ident(1)?,
                        base: self.ident(2)?,
                        emitter: self.ident(3)?,
                        model: self.ident(4)?,
                        params: self.parse_params(5)?,
                    })),
                    'M' => Line::Component(Component::Mos(Mos {
                        name: self.ident(0)?,
                        d: self.ident(1)?,
                        g: self.ident(2)?,
                        s: self.ident(3)?,
                        b: self.ident(4)?,
                        model: self.ident(5)?,
                        params: self.parse_params(6)?,
                    })),
                    'X' => {
                        // An X instance line looks like this:
                        //
                        // ```spice
                        // Xname port0 port1 port2 child param1=value1
                        // ```
                        //
                        // The index of "child" is the index of the first
                        // equals sign minus 2, or the last token if there are
                        // no parameters.
                        let pos = self.buffer.iter().position(|t| matches!(t, Token::Equals));
                        let child_idx = pos.unwrap_or(self.buffer.len() + 1) - 2;
                        let child = self
                            .buffer
                            .get(child_idx)
                            .ok_or_else(|| ParserError::InvalidLine {
                                line: self.buffer.clone(),
                                reason: "an instance takes at least a child cell name".to_string(),
                            })?
                            .try_ident()?
                            .clone();
                        let ports = self.buffer[1..child_idx]
                            .iter()
                            .map(|x| x.try_ident().cloned())
                            .collect::<Result<Vec<_>, _>>()?;
                        let params = self.parse_params(child_idx + 1)?;

                        Line::Component(Component::Instance(Instance {
                            name: self.ident(0)?,
                            ports,
                            child,
                            params,
                        }))
                    }
                    kind => return Err(ParserError::UnexpectedComponentType(kind)),
                }
            }
            tok => return Err(ParserError::UnexpectedToken(tok.clone())),
        };
        self.buffer.clear();
        Ok(Some(line))
    }

    fn ident(&self, idx: usize) -> Result<Substr, ParserError> {
        self.buffer
            .get(idx)
            .ok_or_else(|| ParserError::InvalidLine {
                line: self.buffer.clone(),
                reason: format!("expected at least {} tokens", idx + 1),
            })?
            .try_ident()
            .cloned()
    }

    fn expect_len(&self, len: usize, reason: &str) -> Result<(), ParserError> {
        if self.buffer.len() != len {
            return Err(ParserError::InvalidLine {
                line: self.buffer.clone(),
                reason: reason.to_string(),
            });
        }
        Ok(())
    }

    fn parse_params(&self, start: usize) -> Result<Params, ParserError> {
        let mut params = Params::default();
        let mut i = start;
        while i < self.buffer.len() {
            let key = self.ident(i)?;
            if !matches!(self.buffer.get(i + 1), Some(Token::Equals)) {
                return Err(ParserError::InvalidLine {
                    line: self.buffer.clone(),
                    reason: "expected `=` in a parameter assignment".to_string(),
                });
            }
            let value = self.ident(i + 2)?;
            params.insert(key, value);
            i += 3;
        }
        Ok(params)
    }
}

/// Data associated with a parsed netlist.
#[derive(Debug)]
pub struct ParsedNetlist {
    /// The parsed contents of the netlist.
    pub ast: Ast,

    /// The name of the netlist.
    ///
    /// By default, this is the first line of the input, with comment markers
    /// and whitespace trimmed.
    pub name: ArcStr,
}

impl ParsedNetlist {
    /// Reconstructs a circuit graph from this netlist.
    pub fn to_graph(&self) -> conv::ConvResult<conv::Reconstruction> {
        conv::GraphReconstructor::new(self.name.clone(), &self.ast).convert()
    }
}

/// The abstract syntax tree (AST) of a parsed netlist.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Ast {
    /// The list of elements in the netlist.
    pub elems: Vec<Elem>,
}

/// A single logical line in a netlist.
///
/// A logical line may contain multiple lines in a file if all lines after
/// the first are separated by the line continuation character ('+').
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Line {
    /// A subcircuit declaration.
    SubcktDecl {
        /// The name of the subcircuit.
        name: Substr,
        /// The external nets exposed by the subcircuit, in order.
        ports: Vec<Node>,
    },
    /// A device record.
    Component(Component),
    /// The end of a subcircuit.
    EndSubckt,
}

/// An element of a netlist AST.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Elem {
    /// A subcircuit declaration.
    Subckt(Subckt),
    /// A top-level device record.
    Component(Component),
}

/// The contents of a subcircuit.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Subckt {
    /// The subcircuit name.
    pub name: Substr,
    /// The external nets exposed by this subcircuit, in order.
    pub ports: Vec<Node>,
    /// The device records in the subcircuit.
    pub components: Vec<Component>,
}

/// A netlist device record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Component {
    /// A two-terminal passive device (R, L, or C).
    Passive(Passive),
    /// An independent source (V or I).
    Source(Source),
    /// A source controlled by a sensed voltage (E or G).
    VoltageControlled(VoltageControlled),
    /// A source controlled by the current through a probe source (F or H).
    CurrentControlled(CurrentControlled),
    /// A diode (declared with a 'D').
    Diode(Diode),
    /// A bipolar junction transistor (declared with a 'Q').
    Bjt(Bjt),
    /// A MOSFET (declared with an 'M').
    Mos(Mos),
    /// An instance of a subcircuit (declared with an 'X').
    Instance(Instance),
}

impl Component {
    /// The name of this record.
    pub fn name(&self) -> &Substr {
        match self {
            Self::Passive(c) => &c.name,
            Self::Source(c) => &c.name,
            Self::VoltageControlled(c) => &c.name,
            Self::CurrentControlled(c) => &c.name,
            Self::Diode(c) => &c.name,
            Self::Bjt(c) => &c.name,
            Self::Mos(c) => &c.name,
            Self::Instance(c) => &c.name,
        }
    }
}

/// A two-terminal passive device record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Passive {
    /// The record letter ('R', 'L', or 'C').
    pub letter: char,
    /// The name of the instance.
    pub name: Substr,
    /// The net connected to the positive terminal.
    pub pos: Node,
    /// The net connected to the negative terminal.
    pub neg: Node,
    /// The device value.
    pub value: Substr,
}

/// An independent source record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Source {
    /// The record letter ('V' or 'I').
    pub letter: char,
    /// The name of the instance.
    pub name: Substr,
    /// The net connected to the positive terminal.
    pub pos: Node,
    /// The net connected to the negative terminal.
    pub neg: Node,
    /// The source value.
    pub value: SourceValue,
}

/// The value of an independent source record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SourceValue {
    /// A constant value.
    Dc(Substr),
    /// A time-varying waveform with named parameters.
    Waveform {
        /// The shape keyword (e.g. `PULSE`).
        shape: Substr,
        /// Named parameters, in declaration order.
        params: Params,
    },
    /// A piecewise-linear waveform.
    Pwl {
        /// The coordinate pairs.
        points: Vec<(Substr, Substr)>,
        /// Named parameters following the coordinates.
        params: Params,
    },
}

/// A voltage-controlled source record (E or G).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VoltageControlled {
    /// The record letter ('E' or 'G').
    pub letter: char,
    /// The name of the instance.
    pub name: Substr,
    /// The net connected to the positive output terminal.
    pub pos: Node,
    /// The net connected to the negative output terminal.
    pub neg: Node,
    /// The net sensed as the positive control terminal.
    pub cpos: Node,
    /// The net sensed as the negative control terminal.
    pub cneg: Node,
    /// The gain or transconductance.
    pub value: Substr,
}

/// A current-controlled source record (F or H).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CurrentControlled {
    /// The record letter ('F' or 'H').
    pub letter: char,
    /// The name of the instance.
    pub name: Substr,
    /// The net connected to the positive output terminal.
    pub pos: Node,
    /// The net connected to the negative output terminal.
    pub neg: Node,
    /// The name of the voltage source sensed as a current probe.
    pub probe: Substr,
    /// The current gain or transresistance.
    pub value: Substr,
}

/// A diode record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Diode {
    /// The name of the instance.
    pub name: Substr,
    /// The net connected to the anode.
    pub pos: Node,
    /// The net connected to the cathode.
    pub neg: Node,
    /// The name of the associated model.
    pub model: Substr,
    /// Parameters and their values.
    pub params: Params,
}

/// A bipolar junction transistor record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Bjt {
    /// The name of the instance.
    pub name: Substr,
    /// The net connected to the collector.
    pub collector: Node,
    /// The net connected to the base.
    pub base: Node,
    /// The net connected to the emitter.
    pub emitter: Node,
    /// The name of the associated model.
    pub model: Substr,
    /// Parameters and their values.
    pub params: Params,
}

/// A MOSFET record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Mos {
    /// The name of the instance.
    pub name: Substr,
    /// The drain net.
    pub d: Node,
    /// The gate net.
    pub g: Node,
    /// The source net.
    pub s: Node,
    /// The body/substrate net.
    pub b: Node,
    /// The name of the associated model.
    pub model: Substr,
    /// Parameters and their values.
    pub params: Params,
}

/// A subcircuit instance record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Instance {
    /// The name of the instance.
    pub name: Substr,
    /// The nets connected to the subcircuit's external nets, in order.
    pub ports: Vec<Node>,
    /// The name of the child subcircuit.
    pub child: Substr,
    /// Instance parameters.
    pub params: Params,
}

/// Ordered parameter values.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Params {
    values: IndexMap<Substr, Substr>,
}

impl Params {
    /// Create a new, empty parameter set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key-value pair into the parameter set.
    pub fn insert(&mut self, k: impl Into<Substr>, v: impl Into<Substr>) {
        self.values.insert(k.into(), v.into());
    }

    /// Get the value corresponding to the given key.
    pub fn get(&self, k: &str) -> Option<&Substr> {
        self.values.get(k)
    }

    /// An iterator over all key-value pairs, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Substr, &Substr)> {
        self.values.iter()
    }

    /// The number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the parameter set is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(Substr, Substr)> for Params {
    fn from_iter<T: IntoIterator<Item = (Substr, Substr)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[inline]
fn is_newline(c: char) -> bool {
    c == '\n' || c == '\r'
}

#[inline]
fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

#[inline]
fn is_space_or_newline(c: char) -> bool {
    is_space(c) || is_newline(c)
}

#[inline]
fn is_special(c: char) -> bool {
    is_space_or_newline(c) || c == '='
}

struct Tokenizer {
    data: Substr,
    rem: Substr,
    state: TokState,
    comments: HashSet<char>,
    line_continuation: char,
}

/// A netlist token.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Token {
    /// A directive that starts with a leading dot.
    ///
    /// Examples: ".subckt", ".ends".
    ///
    /// The tokenizer returns tokens with case matching the input file.
    /// No conversion to upper/lowercase is made.
    Directive(Substr),
    /// An identifier.
    Ident(Substr),
    /// A line end indicator.
    LineEnd,
    /// An equal sign token ('=').
    Equals,
}

#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Debug)]
enum TokState {
    /// Initial state.
    #[default]
    Init,
    /// Parsing a line.
    Line,
}

/// An error arising from parsing a netlist.
#[derive(Debug, Error)]
pub enum ParserError {
    /// A tokenizer error.
    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),
    /// Found a line in the wrong context.
    ///
    /// For example, a ".ends" line with no matching ".subckt" line.
    #[error("unexpected line: {0:?}")]
    UnexpectedLine(Box<Line>),
    /// An unsupported or unexpected directive.
    #[error("unexpected directive: {0}")]
    UnexpectedDirective(Substr),
    /// An unsupported or unexpected device type letter.
    #[error("unexpected component type: {0}")]
    UnexpectedComponentType(char),
    /// An unsupported or unexpected token.
    #[error("unexpected token: {0:?}")]
    UnexpectedToken(Token),
    /// An invalid line.
    #[error("invalid line `{line:?}`: {reason}")]
    InvalidLine {
        /// The tokens in the offending line.
        line: Vec<Token>,
        /// The reason the line is invalid.
        reason: String,
    },
    /// Error trying to read the given file.
    #[error("failed to read file at path `{path:?}`: {err:?}")]
    FailedToRead {
        /// The path we attempted to read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        err: std::io::Error,
    },
}

/// A tokenizer error.
#[derive(Debug, Error)]
pub struct TokenizerError {
    state: TokState,
    ofs: usize,
    message: ArcStr,
    token: Substr,
}

impl Tokenizer {
    fn new(data: impl Into<arcstr::Substr>) -> Self {
        let data = data.into();
        let rem = data.clone();
        Self {
            data: Substr(data),
            rem: Substr(rem),
            state: TokState::Init,
            comments: HashSet::from(['*', '$']),
            line_continuation: '+',
        }
    }

    fn get(&mut self) -> Result<Option<Token>, TokenizerError> {
        loop {
            self.take_ws();
            if self.rem.is_empty() {
                // handle EOF
                if self.state == TokState::Line {
                    // At EOF, but have not yet returned a final LineEnd token.
                    self.state = TokState::Init;
                    return Ok(Some(Token::LineEnd));
                } else {
                    // At EOF, no more tokens.
                    return Ok(None);
                }
            }

            let c = self.peek().unwrap();
            if c == '=' {
                self.take1();
                return Ok(Some(Token::Equals));
            }
            match self.state {
                TokState::Init => {
                    if self.comments.contains(&c) {
                        self.take_until_newline();
                    } else if c.is_whitespace() {
                        self.take1();
                    } else if c == self.line_continuation {
                        self.err("unexpected line continuation", c)?;
                    } else {
                        self.state = TokState::Line;
                    }
                }
                TokState::Line => {
                    if is_newline(c) {
                        self.take1();
                        self.take_ws();
                        if self.peek().unwrap_or(self.line_continuation) != self.line_continuation {
                            self.state = TokState::Init;
                            return Ok(Some(Token::LineEnd));
                        }
                    } else if c == self.line_continuation {
                        self.take1();
                    } else if self.comments.contains(&c) {
                        self.take_until_newline();
                    } else if c == '.' {
                        let word = self.take_ident();
                        return Ok(Some(Token::Directive(word)));
                    } else {
                        let word = self.take_ident();
                        return Ok(Some(Token::Ident(word)));
                    }
                }
            }
        }
    }

    fn err(
        &self,
        message: impl Into<ArcStr>,
        token: impl Into<Substr>,
    ) -> Result<(), TokenizerError> {
        Err(TokenizerError {
            state: self.state,
            ofs: self.data.len() - self.rem.len(),
            message: message.into(),
            token: token.into(),
        })
    }

    fn take1(&mut self) -> Option<char> {
        let c = self.rem.chars().next()?;
        self.rem = Substr(self.rem.substr(1..));
        Some(c)
    }

    fn take_until_newline(&mut self) -> Substr {
        let (rest, value) = take_till::<_, _, ()>(is_newline)(self.rem.as_str())
            .expect("take_till is infallible");
        let taken = Substr(self.rem.substr_from(value));
        let rem = Substr(self.rem.substr_from(rest));
        self.rem = rem;
        taken
    }

    fn take_ident(&mut self) -> Substr {
        let (rest, value) = take_till::<_, _, ()>(is_special)(self.rem.as_str())
            .expect("take_till is infallible");
        let taken = Substr(self.rem.substr_from(value));
        let rem = Substr(self.rem.substr_from(rest));
        self.rem = rem;
        taken
    }

    fn take_ws(&mut self) {
        let (rest, _) = take_while::<_, _, ()>(is_space)(self.rem.as_str())
            .expect("take_while is infallible");
        let rem = Substr(self.rem.substr_from(rest));
        self.rem = rem;
    }

    fn peek(&self) -> Option<char> {
        self.rem.chars().next()
    }
}

struct Tokens {
    tok: Tokenizer,
}

impl Iterator for Tokens {
    type Item = Result<Token, TokenizerError>;
    fn next(&mut self) -> Option<Self::Item> {
        self.tok.get().transpose()
    }
}

impl IntoIterator for Tokenizer {
    type Item = Result<Token, TokenizerError>;
    type IntoIter = Tokens;
    fn into_iter(self) -> Self::IntoIter {
        Tokens { tok: self }
    }
}

impl Deref for Substr {
    type Target = arcstr::Substr;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Substr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Substr> for arcstr::Substr {
    fn from(value: Substr) -> Self {
        value.0
    }
}

impl From<&str> for Substr {
    fn from(value: &str) -> Self {
        Self(arcstr::Substr::from(value))
    }
}

impl From<String> for Substr {
    fn from(value: String) -> Self {
        Self(arcstr::Substr::full(ArcStr::from(value)))
    }
}

impl From<arcstr::Substr> for Substr {
    fn from(value: arcstr::Substr) -> Self {
        Self(value)
    }
}

impl From<ArcStr> for Substr {
    fn from(value: ArcStr) -> Self {
        Self(arcstr::Substr::full(value))
    }
}

impl From<char> for Substr {
    fn from(value: char) -> Self {
        Self(arcstr::Substr::from(value.to_string()))
    }
}

impl Borrow<str> for Substr {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Token {
    fn try_ident(&self) -> Result<&Substr, ParserError> {
        match self {
            Self::Ident(x) => Ok(x),
            _ => Err(ParserError::UnexpectedToken(self.clone())),
        }
    }
}

impl Display for TokenizerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (token {} at offset {}, state {:?})",
            self.message, self.token, self.ofs, self.state
        )
    }
}
