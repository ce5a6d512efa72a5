//! Untyped document tree for assets that have not been bound to a schema yet.
//!
//! Upgraders probe legacy fields through option-returning accessors, so a
//! missing field is a no-op rather than an error. Nothing here coerces
//! between scalar kinds: `"true"` is a string, not a boolean.

use indexmap::IndexMap;

/// A primitive leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    /// An integer above `i64::MAX`. Smaller values are always `Integer`.
    Unsigned(u64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Returns the value of a `Bool`, `None` for every other kind.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a non-negative integer of either width.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::Integer(i) => u64::try_from(*i).ok(),
            Scalar::Unsigned(u) => Some(*u),
            _ => None,
        }
    }

    /// Returns a `Float`; integers are not widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the scalar kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Integer(_) | Scalar::Unsigned(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::String(_) => "string",
        }
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Vec<Node>),
    Scalar(Scalar),
    /// A field that an upgrader blanked on purpose. It keeps its position in
    /// the mapping, unlike a removed field.
    Empty,
}

impl Node {
    /// Looks up `key` when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Mutable lookup of `key` when this node is a mapping.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.as_mapping_mut().and_then(|m| m.get_mut(key))
    }

    /// The mapping, if this node is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// The items, if this node is a sequence.
    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// The scalar, if this node is a leaf.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// A boolean leaf. Strings such as `"true"` are not converted.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// True for a field an upgrader blanked.
    pub fn is_empty_marker(&self) -> bool {
        matches!(self, Node::Empty)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(Scalar::Null))
    }

    /// True for a node that carries a value: neither blanked nor null.
    pub fn has_value(&self) -> bool {
        !self.is_empty_marker() && !self.is_null()
    }

    /// Short name of the node kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Scalar(s) => s.kind(),
            Node::Empty => "empty",
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::Mapping(Mapping::new())
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Node::Scalar(scalar)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Scalar(Scalar::Integer(i))
    }
}

impl From<u64> for Node {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => Node::Scalar(Scalar::Integer(i)),
            Err(_) => Node::Scalar(Scalar::Unsigned(u)),
        }
    }
}

impl From<f64> for Node {
    fn from(f: f64) -> Self {
        Node::Scalar(Scalar::Float(f))
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Scalar(Scalar::String(s))
    }
}

impl From<Mapping> for Node {
    fn from(m: Mapping) -> Self {
        Node::Mapping(m)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(items)
    }
}

/// An ordered mapping with unique string keys.
///
/// Insertion order is kept so a migrated document renders its fields in the
/// order the author wrote them. Equality is order-sensitive for the same
/// reason.
///
/// A mapping may carry a type tag (`!SpriteFont` in YAML, stored without the
/// `!`), which names the concrete type of a polymorphic value.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    tag: Option<String>,
    entries: IndexMap<String, Node>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            entries: IndexMap::new(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn set_tag(&mut self, tag: Option<String>) {
        self.tag = tag;
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries.get_mut(key)
    }

    /// Returns the field only if it carries a value.
    ///
    /// Blanked (`Empty`) and null fields read as absent, which is what an
    /// upgrader probing an optional legacy field wants.
    pub fn present(&self, key: &str) -> Option<&Node> {
        self.entries.get(key).filter(|node| node.has_value())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Sets `key` to `value`.
    ///
    /// An existing key keeps its position and the previous value is returned;
    /// a new key is appended.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Node>) -> Option<Node> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes `key` entirely, keeping the order of the remaining fields.
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        self.entries.shift_remove(key)
    }

    /// Replaces the value of `key` with [`Node::Empty`], keeping its position.
    ///
    /// Returns false if the key does not exist; nothing is added in that case.
    pub fn blank(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(node) => {
                *node = Node::Empty;
                true
            }
            None => false,
        }
    }

    /// Returns the mapping stored under `key`, inserting an empty one when the
    /// key is missing or holds no value.
    ///
    /// Returns `None` if `key` holds a value of another kind; the caller
    /// decides whether that is an error.
    pub fn mapping_entry(&mut self, key: &str) -> Option<&mut Mapping> {
        if self.present(key).is_none() {
            self.insert(key, Mapping::new());
        }
        self.entries.get_mut(key).and_then(Node::as_mapping_mut)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.entries.len() == other.entries.len()
            && self.entries.iter().eq(other.entries.iter())
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        Self {
            tag: None,
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for Mapping {
    type Item = (String, Node);
    type IntoIter = indexmap::map::IntoIter<String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
