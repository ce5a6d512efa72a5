//! Conversions between on-disk text formats and the untyped document tree.
//!
//! Upgraders never see a concrete format. Files are parsed into a [`Node`]
//! here, migrated, and rendered back in the format they came from.
//!
//! Format notes:
//! - YAML mapping tags (`!SpriteFont`) are kept on [`Mapping::tag`]; tags on
//!   scalars and sequences are rejected
//! - JSON and TOML have no tags, so rendering a tagged mapping to them fails
//! - Blanked fields ([`Node::Empty`]) render as `null` in YAML and JSON and are
//!   omitted from TOML tables
//! - TOML datetimes are read as strings
//! - Integers above `i64::MAX` stay exact in YAML and JSON; TOML cannot hold
//!   them

use crate::migration::AssetKind;
use std::fmt;
use std::path::Path;
use xasset_core::{AssetError, Mapping, Node, Result, Scalar};

/// Text formats a document can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Yaml,
    Json,
    Toml,
}

impl DocumentFormat {
    pub const fn name(&self) -> &'static str {
        match self {
            DocumentFormat::Yaml => "YAML",
            DocumentFormat::Json => "JSON",
            DocumentFormat::Toml => "TOML",
        }
    }

    /// Picks the format from a file extension. Asset files are YAML.
    pub fn from_path(path: &Path) -> Option<DocumentFormat> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            "json" => Some(DocumentFormat::Json),
            "toml" => Some(DocumentFormat::Toml),
            other => AssetKind::from_extension(other).map(|_| DocumentFormat::Yaml),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses `text` into a document tree.
pub fn parse_document(text: &str, format: DocumentFormat) -> Result<Node> {
    match format {
        DocumentFormat::Yaml => yaml::to_node(serde_yaml::from_str(text)?),
        DocumentFormat::Json => Ok(json::to_node(serde_json::from_str(text)?)),
        DocumentFormat::Toml => Ok(toml_format::table_to_node(toml::from_str(text)?)),
    }
}

/// Renders a document tree as `format` text.
pub fn render_document(document: &Node, format: DocumentFormat) -> Result<String> {
    match format {
        DocumentFormat::Yaml => Ok(serde_yaml::to_string(&yaml::from_node(document))?),
        DocumentFormat::Json => {
            let value = json::from_node(document)?;
            let mut text = serde_json::to_string_pretty(&value)?;
            text.push('\n');
            Ok(text)
        }
        DocumentFormat::Toml => {
            let table = document.as_mapping().ok_or_else(|| {
                AssetError::serialization(
                    "TOML",
                    format!("document root must be a mapping, found {}", document.kind()),
                )
            })?;
            Ok(toml::to_string(&toml_format::from_mapping(table)?)?)
        }
    }
}

mod yaml {
    use super::*;
    use serde_yaml::Value;
    use serde_yaml::value::{Tag, TaggedValue};

    pub(super) fn to_node(value: Value) -> Result<Node> {
        Ok(match value {
            Value::Null => Node::Scalar(Scalar::Null),
            Value::Bool(b) => Node::from(b),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Node::from(i),
                (None, Some(u)) => Node::from(u),
                _ => Node::from(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Node::from(s),
            Value::Sequence(items) => Node::Sequence(
                items.into_iter().map(to_node).collect::<Result<Vec<_>>>()?,
            ),
            Value::Mapping(entries) => Node::Mapping(to_mapping(entries)?),
            Value::Tagged(tagged) => {
                let TaggedValue { tag, value } = *tagged;
                let name = tag.to_string().trim_start_matches('!').to_string();
                match value {
                    Value::Mapping(entries) => {
                        let mut mapping = to_mapping(entries)?;
                        mapping.set_tag(Some(name));
                        Node::Mapping(mapping)
                    }
                    _ => {
                        return Err(AssetError::serialization(
                            "YAML",
                            format!("tag '!{}' is only supported on mappings", name),
                        ));
                    }
                }
            }
        })
    }

    fn to_mapping(entries: serde_yaml::Mapping) -> Result<Mapping> {
        let mut mapping = Mapping::new();
        for (key, value) in entries {
            let key = match key {
                Value::String(s) => s,
                other => {
                    return Err(AssetError::serialization(
                        "YAML",
                        format!("mapping keys must be strings, found {:?}", other),
                    ));
                }
            };
            mapping.insert(key, to_node(value)?);
        }
        Ok(mapping)
    }

    pub(super) fn from_node(node: &Node) -> Value {
        match node {
            Node::Empty => Value::Null,
            Node::Scalar(scalar) => match scalar {
                Scalar::Null => Value::Null,
                Scalar::Bool(b) => Value::Bool(*b),
                Scalar::Integer(i) => Value::Number((*i).into()),
                Scalar::Unsigned(u) => Value::Number((*u).into()),
                Scalar::Float(f) => Value::Number((*f).into()),
                Scalar::String(s) => Value::String(s.clone()),
            },
            Node::Sequence(items) => Value::Sequence(items.iter().map(from_node).collect()),
            Node::Mapping(mapping) => {
                let entries: serde_yaml::Mapping = mapping
                    .iter()
                    .map(|(k, v)| (Value::String(k.to_string()), from_node(v)))
                    .collect();
                match mapping.tag().filter(|tag| !tag.is_empty()) {
                    Some(tag) => Value::Tagged(Box::new(TaggedValue {
                        tag: Tag::new(tag),
                        value: Value::Mapping(entries),
                    })),
                    None => Value::Mapping(entries),
                }
            }
        }
    }
}

mod json {
    use super::*;
    use serde_json::Value;

    pub(super) fn to_node(value: Value) -> Node {
        match value {
            Value::Null => Node::Scalar(Scalar::Null),
            Value::Bool(b) => Node::from(b),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Node::from(i),
                (None, Some(u)) => Node::from(u),
                _ => Node::from(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Node::from(s),
            Value::Array(items) => Node::Sequence(items.into_iter().map(to_node).collect()),
            Value::Object(entries) => Node::Mapping(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, to_node(v)))
                    .collect(),
            ),
        }
    }

    pub(super) fn from_node(node: &Node) -> Result<Value> {
        Ok(match node {
            Node::Empty => Value::Null,
            Node::Scalar(scalar) => match scalar {
                Scalar::Null => Value::Null,
                Scalar::Bool(b) => Value::Bool(*b),
                Scalar::Integer(i) => Value::from(*i),
                Scalar::Unsigned(u) => Value::from(*u),
                Scalar::Float(f) => serde_json::Number::from_f64(*f)
                    .map(Value::Number)
                    .ok_or_else(|| {
                        AssetError::serialization("JSON", format!("{} is not a finite number", f))
                    })?,
                Scalar::String(s) => Value::String(s.clone()),
            },
            Node::Sequence(items) => {
                Value::Array(items.iter().map(from_node).collect::<Result<Vec<_>>>()?)
            }
            Node::Mapping(mapping) => {
                if let Some(tag) = mapping.tag() {
                    return Err(AssetError::serialization(
                        "JSON",
                        format!("cannot represent tag '!{}'", tag),
                    ));
                }
                let mut object = serde_json::Map::new();
                for (key, value) in mapping.iter() {
                    object.insert(key.to_string(), from_node(value)?);
                }
                Value::Object(object)
            }
        })
    }
}

mod toml_format {
    use super::*;
    use toml::Value;

    pub(super) fn table_to_node(table: toml::Table) -> Node {
        Node::Mapping(
            table
                .into_iter()
                .map(|(k, v)| (k, to_node(v)))
                .collect(),
        )
    }

    fn to_node(value: Value) -> Node {
        match value {
            Value::String(s) => Node::from(s),
            Value::Integer(i) => Node::from(i),
            Value::Float(f) => Node::from(f),
            Value::Boolean(b) => Node::from(b),
            Value::Datetime(dt) => Node::from(dt.to_string()),
            Value::Array(items) => Node::Sequence(items.into_iter().map(to_node).collect()),
            Value::Table(table) => table_to_node(table),
        }
    }

    pub(super) fn from_mapping(mapping: &Mapping) -> Result<toml::Table> {
        if let Some(tag) = mapping.tag() {
            return Err(AssetError::serialization(
                "TOML",
                format!("cannot represent tag '!{}'", tag),
            ));
        }

        let mut table = toml::Table::new();
        // TOML has no null; valueless fields are left out.
        for (key, value) in mapping.iter().filter(|(_, v)| v.has_value()) {
            table.insert(key.to_string(), from_node(value)?);
        }
        Ok(table)
    }

    fn from_node(node: &Node) -> Result<Value> {
        Ok(match node {
            Node::Empty | Node::Scalar(Scalar::Null) => {
                return Err(AssetError::serialization(
                    "TOML",
                    "null values cannot appear in arrays",
                ));
            }
            Node::Scalar(Scalar::Bool(b)) => Value::Boolean(*b),
            Node::Scalar(Scalar::Integer(i)) => Value::Integer(*i),
            Node::Scalar(Scalar::Unsigned(u)) => {
                return Err(AssetError::serialization(
                    "TOML",
                    format!("{} exceeds the TOML integer range", u),
                ));
            }
            Node::Scalar(Scalar::Float(f)) => Value::Float(*f),
            Node::Scalar(Scalar::String(s)) => Value::String(s.clone()),
            Node::Sequence(items) => {
                Value::Array(items.iter().map(from_node).collect::<Result<Vec<_>>>()?)
            }
            Node::Mapping(mapping) => Value::Table(from_mapping(mapping)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPRITE_FONT: &str = "\
!SpriteFont
Id: 4b0b6b9e-0c4d-4b52-a1a4-4bfe2c1e7c55
SerializedVersion:
  Xenko: 1.5.0-alpha09
FontSource: !SystemFontProvider
  FontName: Arial
Size: 16.0
IsDynamic: true
CharacterRegions:
- Start: 32
  End: 127
";

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.yml")), Some(DocumentFormat::Yaml));
        assert_eq!(DocumentFormat::from_path(Path::new("a.JSON")), Some(DocumentFormat::Json));
        assert_eq!(DocumentFormat::from_path(Path::new("a.toml")), Some(DocumentFormat::Toml));
        assert_eq!(
            DocumentFormat::from_path(Path::new("fonts/Title.xkfnt")),
            Some(DocumentFormat::Yaml)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("a.png")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_parse_yaml_keeps_tags_and_order() {
        let document = parse_document(SPRITE_FONT, DocumentFormat::Yaml).unwrap();
        let root = document.as_mapping().unwrap();

        assert_eq!(root.tag(), Some("SpriteFont"));
        assert_eq!(
            root.keys().collect::<Vec<_>>(),
            vec!["Id", "SerializedVersion", "FontSource", "Size", "IsDynamic", "CharacterRegions"]
        );

        let source = root.get("FontSource").and_then(Node::as_mapping).unwrap();
        assert_eq!(source.tag(), Some("SystemFontProvider"));
        assert_eq!(source.get("FontName").and_then(Node::as_str), Some("Arial"));

        assert_eq!(root.get("IsDynamic").and_then(Node::as_bool), Some(true));
        let regions = root.get("CharacterRegions").and_then(Node::as_sequence).unwrap();
        assert_eq!(regions[0].get("End").and_then(|n| n.as_scalar()?.as_i64()), Some(127));
    }

    #[test]
    fn test_yaml_render_is_reparsed_identically() {
        let document = parse_document(SPRITE_FONT, DocumentFormat::Yaml).unwrap();
        let text = render_document(&document, DocumentFormat::Yaml).unwrap();

        assert!(text.starts_with("!SpriteFont"));
        assert_eq!(parse_document(&text, DocumentFormat::Yaml).unwrap(), document);
    }

    #[test]
    fn test_yaml_non_string_key_is_rejected() {
        let err = parse_document("1: one\n", DocumentFormat::Yaml).unwrap_err();
        assert!(matches!(err, AssetError::Serialization { ref format, .. } if format == "YAML"));
    }

    #[test]
    fn test_yaml_tagged_scalar_is_rejected() {
        let err = parse_document("Color: !Rgb 0xff0000\n", DocumentFormat::Yaml).unwrap_err();
        assert!(err.to_string().contains("!Rgb"));
    }

    #[test]
    fn test_empty_renders_as_null() {
        let mut mapping = Mapping::new();
        mapping.insert("NoPremultiply", Node::Empty);
        mapping.insert("IsPremultiplied", false);
        let document = Node::Mapping(mapping);

        let yaml = render_document(&document, DocumentFormat::Yaml).unwrap();
        assert_eq!(yaml, "NoPremultiply: null\nIsPremultiplied: false\n");

        let json = render_document(&document, DocumentFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["NoPremultiply"].is_null());
        assert_eq!(value["IsPremultiplied"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_json_keeps_field_order() {
        let text = r#"{"Size": 16, "FontName": "Arial", "IsDynamic": false}"#;
        let document = parse_document(text, DocumentFormat::Json).unwrap();

        assert_eq!(
            document.as_mapping().unwrap().keys().collect::<Vec<_>>(),
            vec!["Size", "FontName", "IsDynamic"]
        );
        let rendered = render_document(&document, DocumentFormat::Json).unwrap();
        assert!(rendered.find("Size").unwrap() < rendered.find("IsDynamic").unwrap());
    }

    #[test]
    fn test_json_rejects_tags_and_non_finite_floats() {
        let document = parse_document(SPRITE_FONT, DocumentFormat::Yaml).unwrap();
        assert!(render_document(&document, DocumentFormat::Json).is_err());

        let mut mapping = Mapping::new();
        mapping.insert("Size", f64::INFINITY);
        assert!(render_document(&Node::Mapping(mapping), DocumentFormat::Json).is_err());
    }

    #[test]
    fn test_toml_omits_valueless_fields() {
        let mut stamps = Mapping::new();
        stamps.insert("Xenko", "1.7.0-beta02");
        let mut mapping = Mapping::new();
        mapping.insert("NoPremultiply", Node::Empty);
        mapping.insert("Size", 16.0);
        mapping.insert("SerializedVersion", stamps);

        let text = render_document(&Node::Mapping(mapping), DocumentFormat::Toml).unwrap();
        assert!(!text.contains("NoPremultiply"));

        let reparsed = parse_document(&text, DocumentFormat::Toml).unwrap();
        assert_eq!(reparsed.get("Size").and_then(|n| n.as_scalar()?.as_f64()), Some(16.0));
        assert_eq!(
            reparsed
                .get("SerializedVersion")
                .and_then(|n| n.get("Xenko"))
                .and_then(Node::as_str),
            Some("1.7.0-beta02")
        );
    }

    #[test]
    fn test_toml_rejects_null_in_array_and_scalar_root() {
        let mut mapping = Mapping::new();
        mapping.insert("Glyphs", vec![Node::from("a"), Node::Empty]);
        assert!(render_document(&Node::Mapping(mapping), DocumentFormat::Toml).is_err());

        assert!(render_document(&Node::from(1i64), DocumentFormat::Toml).is_err());
    }

    #[test]
    fn test_large_unsigned_integer_is_exact() {
        for (text, format) in [
            ("Seed: 18446744073709551615\n", DocumentFormat::Yaml),
            ("{\"Seed\": 18446744073709551615}", DocumentFormat::Json),
        ] {
            let document = parse_document(text, format).unwrap();
            assert_eq!(
                document.get("Seed").and_then(Node::as_scalar),
                Some(&Scalar::Unsigned(u64::MAX))
            );

            let rendered = render_document(&document, format).unwrap();
            assert!(rendered.contains("18446744073709551615"), "{}", rendered);
            assert_eq!(parse_document(&rendered, format).unwrap(), document);
        }

        let document =
            parse_document("Seed: 18446744073709551615\n", DocumentFormat::Yaml).unwrap();
        let err = render_document(&document, DocumentFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("18446744073709551615"));
    }

    #[test]
    fn test_toml_datetime_reads_as_string() {
        let document =
            parse_document("Created = 2015-06-01T10:00:00Z\n", DocumentFormat::Toml).unwrap();
        assert_eq!(
            document.get("Created").and_then(Node::as_str),
            Some("2015-06-01T10:00:00Z")
        );
    }
}
