//! Fixture loading from YAML files

use serde::Deserialize;

use std::path::Path;

use cedoc_rules::{ArrayType, Event, RuleOptions};

/// A single test case from a fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub desc: String,
    #[serde(default)]
    pub options: RuleOptions,
    pub events: Vec<EventSpec>,
    /// `ok`, or the snake_case name of the expected error
    pub expect: String,
    /// Friendly name of the rule a structural violation must name
    #[serde(default)]
    pub rule: Option<String>,
    /// Stack depth after each event, when the case pins it down
    #[serde(default)]
    pub depths: Option<Vec<usize>>,
}

/// Event in fixture form - either a bare name or [name, content]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EventSpec {
    /// Event with no payload (list, map, end, ...)
    Bare(String),
    /// Event with a payload [name, "content"]
    WithContent(String, String),
}

impl EventSpec {
    pub fn bare(name: &str) -> Self {
        EventSpec::Bare(name.to_string())
    }

    pub fn with(name: &str, content: impl Into<String>) -> Self {
        EventSpec::WithContent(name.to_string(), content.into())
    }

    pub fn name(&self) -> &str {
        match self {
            EventSpec::Bare(name) => name,
            EventSpec::WithContent(name, _) => name,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            EventSpec::Bare(_) => None,
            EventSpec::WithContent(_, content) => Some(content),
        }
    }

    /// Borrow the fixture entry as a document event.
    ///
    /// Chunk headers are written `"5"` (last chunk) or `"5+"` (more follow).
    pub fn event(&self) -> Event<'_> {
        match self {
            EventSpec::Bare(name) => match name.as_str() {
                "begin_document" => Event::BeginDocument,
                "end_document" => Event::EndDocument,
                "padding" => Event::Padding,
                "null" => Event::Null,
                "uid" => Event::Uid([0; 16]),
                "time" => Event::Time { seconds: 0, nanos: 0 },
                "list" => Event::List,
                "map" => Event::Map,
                "edge" => Event::Edge,
                "node" => Event::Node,
                "end" => Event::EndContainer,
                other => panic!("Unknown bare event {:?}", other),
            },
            EventSpec::WithContent(name, content) => {
                let number = || {
                    content
                        .parse::<i64>()
                        .unwrap_or_else(|e| panic!("Bad number {:?} for {}: {}", content, name, e))
                };
                match name.as_str() {
                    "version" => Event::Version(number() as u64),
                    "comment" => Event::Comment {
                        multiline: false,
                        contents: content.as_bytes(),
                    },
                    "multiline_comment" => Event::Comment {
                        multiline: true,
                        contents: content.as_bytes(),
                    },
                    "bool" => Event::Bool(content == "true"),
                    "int" => Event::Int(number()),
                    "float" => Event::Float(
                        content
                            .parse()
                            .unwrap_or_else(|e| panic!("Bad float {:?}: {}", content, e)),
                    ),
                    "string" => Event::string(content),
                    "resource_id" => Event::resource_id(content),
                    "marker" => Event::Marker(content.as_bytes()),
                    "reference" => Event::LocalReference(content.as_bytes()),
                    "record_type" => Event::RecordType(content.as_bytes()),
                    "record" => Event::Record(content.as_bytes()),
                    "array_begin" => Event::ArrayBegin(
                        ArrayType::from_name(content)
                            .unwrap_or_else(|| panic!("Unknown array type {:?}", content)),
                    ),
                    "chunk" => {
                        let (length, more) = match content.strip_suffix('+') {
                            Some(length) => (length, true),
                            None => (content.as_str(), false),
                        };
                        Event::ArrayChunk {
                            length: length
                                .parse()
                                .unwrap_or_else(|e| panic!("Bad chunk {:?}: {}", content, e)),
                            more_chunks_follow: more,
                        }
                    }
                    "data" => Event::ArrayData(content.as_bytes()),
                    other => panic!("Unknown event {:?}", other),
                }
            }
        }
    }
}

/// Load all test cases from a YAML fixture file
pub fn load_fixtures(path: &Path) -> Vec<TestCase> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read fixture file {:?}: {}", path, e));
    serde_yaml::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture file {:?}: {}", path, e))
}

/// Load fixtures from the standard fixtures directory
pub fn load_fixtures_by_name(name: &str) -> Vec<TestCase> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.yaml", name));
    load_fixtures(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_structure() {
        let cases = load_fixtures_by_name("structure");
        assert!(!cases.is_empty());
        assert!(cases.iter().any(|c| c.id == "round_trip_map"));
    }

    #[test]
    fn test_chunk_notation() {
        let spec = EventSpec::with("chunk", "5+");
        assert_eq!(
            spec.event(),
            Event::ArrayChunk { length: 5, more_chunks_follow: true }
        );
    }
}
