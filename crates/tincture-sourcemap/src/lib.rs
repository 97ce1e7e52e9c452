#![doc = include_str!("../README.md")]

mod vlq;
pub use vlq::encode as encode_vlq;

use serde::{Deserialize, Serialize};

/// A position in one of the original sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalLocation {
    /// Index into [`SourceMap::sources`].
    pub source: u32,
    /// Zero-based line in the original source.
    pub line: u32,
    /// Zero-based column in the original source.
    pub column: u32,
    /// Index into the names table, if the mapping is named.
    pub name: Option<u32>,
}

impl OriginalLocation {
    /// An unnamed original location.
    pub fn new(source: u32, line: u32, column: u32) -> Self {
        Self {
            source,
            line,
            column,
            name: None,
        }
    }
}

/// One generated position and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    /// Zero-based line in the generated output.
    pub generated_line: u32,
    /// Zero-based column in the generated output.
    pub generated_column: u32,
    /// Original location, or `None` for generated-only code.
    pub original: Option<OriginalLocation>,
}

/// A source map under construction.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    names: Vec<String>,
    mappings: Vec<Mapping>,
}

/// The serialized v3 envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapJson {
    /// Always 3.
    pub version: u8,
    /// Source file names.
    pub sources: Vec<String>,
    /// Inline source contents, parallel to `sources`.
    pub sources_content: Vec<Option<String>>,
    /// Symbol names referenced by mappings.
    pub names: Vec<String>,
    /// Base64 VLQ encoded mappings.
    pub mappings: String,
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file and return its index.
    ///
    /// Registering the same name twice returns the existing index.
    pub fn add_source(&mut self, name: &str) -> u32 {
        if let Some(index) = self.sources.iter().position(|s| s == name) {
            return index as u32;
        }
        self.sources.push(name.to_string());
        self.sources_content.push(None);
        (self.sources.len() - 1) as u32
    }

    /// Attach the original text of a registered source.
    pub fn set_source_content(&mut self, source: u32, content: &str) {
        if let Some(slot) = self.sources_content.get_mut(source as usize) {
            *slot = Some(content.to_string());
        }
    }

    /// Register a symbol name and return its index.
    pub fn add_name(&mut self, name: &str) -> u32 {
        if let Some(index) = self.names.iter().position(|n| n == name) {
            return index as u32;
        }
        self.names.push(name.to_string());
        (self.names.len() - 1) as u32
    }

    /// Record a mapping from a generated position.
    pub fn add_mapping(
        &mut self,
        generated_line: u32,
        generated_column: u32,
        original: Option<OriginalLocation>,
    ) {
        self.mappings.push(Mapping {
            generated_line,
            generated_column,
            original,
        });
    }

    /// Registered source names.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Recorded mappings, in insertion order.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Encode the mappings as a VLQ string.
    pub fn mappings_string(&self) -> String {
        let mut sorted = self.mappings.clone();
        sorted.sort_by_key(|m| (m.generated_line, m.generated_column));

        let mut out = String::new();
        let mut line = 0;
        let mut prev_column = 0i64;
        let mut prev_source = 0i64;
        let mut prev_original_line = 0i64;
        let mut prev_original_column = 0i64;
        let mut prev_name = 0i64;
        let mut first_in_line = true;

        for mapping in &sorted {
            while line < mapping.generated_line {
                out.push(';');
                line += 1;
                prev_column = 0;
                first_in_line = true;
            }
            if !first_in_line {
                out.push(',');
            }
            first_in_line = false;

            let column = mapping.generated_column as i64;
            vlq::encode(column - prev_column, &mut out);
            prev_column = column;

            if let Some(original) = mapping.original {
                let source = original.source as i64;
                let original_line = original.line as i64;
                let original_column = original.column as i64;
                vlq::encode(source - prev_source, &mut out);
                vlq::encode(original_line - prev_original_line, &mut out);
                vlq::encode(original_column - prev_original_column, &mut out);
                prev_source = source;
                prev_original_line = original_line;
                prev_original_column = original_column;
                if let Some(name) = original.name {
                    let name = name as i64;
                    vlq::encode(name - prev_name, &mut out);
                    prev_name = name;
                }
            }
        }
        out
    }

    /// Build the serializable envelope.
    pub fn to_json_value(&self) -> SourceMapJson {
        SourceMapJson {
            version: 3,
            sources: self.sources.clone(),
            sources_content: self.sources_content.clone(),
            names: self.names.clone(),
            mappings: self.mappings_string(),
        }
    }

    /// Serialize to v3 JSON text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_source_dedups() {
        let mut map = SourceMap::new();
        assert_eq!(map.add_source("a.css"), 0);
        assert_eq!(map.add_source("b.css"), 1);
        assert_eq!(map.add_source("a.css"), 0);
    }

    #[test]
    fn test_mappings_across_lines() {
        let mut map = SourceMap::new();
        let src = map.add_source("a.css");
        map.add_mapping(0, 0, Some(OriginalLocation::new(src, 0, 0)));
        map.add_mapping(1, 2, Some(OriginalLocation::new(src, 1, 2)));
        map.add_mapping(1, 8, Some(OriginalLocation::new(src, 1, 9)));
        assert_eq!(map.mappings_string(), "AAAA;EACE,MAAO");
    }

    #[test]
    fn test_mappings_sorted_and_empty_lines() {
        let mut map = SourceMap::new();
        let src = map.add_source("a.css");
        map.add_mapping(2, 0, Some(OriginalLocation::new(src, 3, 0)));
        map.add_mapping(0, 0, Some(OriginalLocation::new(src, 0, 0)));
        assert_eq!(map.mappings_string(), "AAAA;;AAGA");
    }

    #[test]
    fn test_unmapped_segment() {
        let mut map = SourceMap::new();
        map.add_mapping(0, 4, None);
        assert_eq!(map.mappings_string(), "I");
    }

    #[test]
    fn test_json_envelope() {
        let mut map = SourceMap::new();
        let src = map.add_source("a.css");
        map.set_source_content(src, ".a{}");
        map.add_mapping(0, 0, Some(OriginalLocation::new(src, 0, 0)));
        let json = map.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"version":3,"sources":["a.css"],"sourcesContent":[".a{}"],"names":[],"mappings":"AAAA"}"#
        );
    }
}
