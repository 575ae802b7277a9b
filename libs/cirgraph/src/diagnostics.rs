//! Conversion diagnostics.
//!
//! Converters report user-facing messages through a [`MessageLog`]. Each
//! message carries a severity and, when one can be identified, the graph
//! node that caused it, so a host tool can attach the message to that node.

use std::fmt::{Display, Formatter};

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::{CircuitId, ComponentId, PinId, WireId};

/// An enumeration of message severity levels.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    /// An informational message.
    Info,
    /// A warning.
    #[default]
    Warning,
    /// An error. Often, but not always, fatal.
    Error,
}

/// A reference to a node in a schematic, of any kind.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum NodeRef {
    /// A circuit.
    Circuit(CircuitId),
    /// A component.
    Component(ComponentId),
    /// A pin.
    Pin(PinId),
    /// A wire.
    Wire(WireId),
}

/// A diagnostic message, optionally attached to a graph node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// The severity of the message.
    pub severity: Severity,
    /// The node that caused the message, if one can be identified.
    pub node: Option<NodeRef>,
    /// The message text.
    pub text: ArcStr,
}

/// A collection of diagnostic messages.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    num_errors: usize,
    num_warnings: usize,
}

impl MessageLog {
    /// Creates a new, empty message log.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the given message to the log.
    pub fn add(&mut self, message: Message) {
        match message.severity {
            Severity::Error => self.num_errors += 1,
            Severity::Warning => self.num_warnings += 1,
            Severity::Info => (),
        }
        self.messages.push(message);
    }

    /// Records an error attached to the given node.
    pub fn error(&mut self, node: impl Into<Option<NodeRef>>, text: impl Into<ArcStr>) {
        self.add(Message {
            severity: Severity::Error,
            node: node.into(),
            text: text.into(),
        });
    }

    /// Records a warning attached to the given node.
    pub fn warning(&mut self, node: impl Into<Option<NodeRef>>, text: impl Into<ArcStr>) {
        self.add(Message {
            severity: Severity::Warning,
            node: node.into(),
            text: text.into(),
        });
    }

    /// Returns an iterator over all messages in the log.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// The number of messages in the log.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the log is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns `true` if the log contains an error.
    #[inline]
    pub fn has_error(&self) -> bool {
        self.num_errors > 0
    }

    /// The number of errors in the log.
    #[inline]
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    /// The number of warnings in the log.
    #[inline]
    pub fn num_warnings(&self) -> usize {
        self.num_warnings
    }
}

impl IntoIterator for MessageLog {
    type Item = Message;
    type IntoIter = <Vec<Message> as IntoIterator>::IntoIter;
    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Circuit(id) => write!(f, "{id}"),
            Self::Component(id) => write!(f, "{id}"),
            Self::Pin(id) => write!(f, "{id}"),
            Self::Wire(id) => write!(f, "{id}"),
        }
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.node {
            Some(node) => write!(f, "{}: {} ({})", self.severity, self.text, node),
            None => write!(f, "{}: {}", self.severity, self.text),
        }
    }
}

impl Display for MessageLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for message in self.messages.iter() {
            writeln!(f, "{}", message)?;
        }
        Ok(())
    }
}

impl From<CircuitId> for NodeRef {
    #[inline]
    fn from(value: CircuitId) -> Self {
        Self::Circuit(value)
    }
}

impl From<ComponentId> for NodeRef {
    #[inline]
    fn from(value: ComponentId) -> Self {
        Self::Component(value)
    }
}

impl From<PinId> for NodeRef {
    #[inline]
    fn from(value: PinId) -> Self {
        Self::Pin(value)
    }
}

impl From<WireId> for NodeRef {
    #[inline]
    fn from(value: WireId) -> Self {
        Self::Wire(value)
    }
}

impl From<CircuitId> for Option<NodeRef> {
    #[inline]
    fn from(value: CircuitId) -> Self {
        Some(NodeRef::Circuit(value))
    }
}

impl From<ComponentId> for Option<NodeRef> {
    #[inline]
    fn from(value: ComponentId) -> Self {
        Some(NodeRef::Component(value))
    }
}

impl From<PinId> for Option<NodeRef> {
    #[inline]
    fn from(value: PinId) -> Self {
        Some(NodeRef::Pin(value))
    }
}

impl From<WireId> for Option<NodeRef> {
    #[inline]
    fn from(value: WireId) -> Self {
        Some(NodeRef::Wire(value))
    }
}
