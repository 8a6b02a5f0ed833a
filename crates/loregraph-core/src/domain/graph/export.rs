//! Graph export to JSON and GraphML
//!
//! Both formats are produced from a [`GraphSnapshot`], so every engine emits
//! byte-compatible documents for the same graph. Content is either returned
//! inline or written to a file whose parent directories are created.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ErrorCode, GraphError, Result, ResultExt};

use super::algorithms::GraphSnapshot;
use super::entity::{EntityType, Metadata};
use super::model::{ExportFormat, ExportPayload, ExportResult};
use super::relationship::RelationshipType;

/// Format marker written into JSON exports
pub const JSON_FORMAT_NAME: &str = "loregraph-json";

/// Version of the JSON export layout
pub const JSON_FORMAT_VERSION: u32 = 1;

/// JSON export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub format: String,
    pub version: u32,
    pub exported_at: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

/// A node in a JSON export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Canonical name
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// An edge in a JSON export; endpoints are canonical names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub context: String,
    pub strength: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl GraphDocument {
    /// Build the export document for a snapshot
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let nodes = snapshot
            .entities()
            .iter()
            .map(|e| NodeRecord {
                id: e.canonical_name(),
                name: e.name.clone(),
                entity_type: e.entity_type,
                aliases: e.aliases.clone(),
                description: e.description.clone(),
                metadata: e.metadata.clone(),
            })
            .collect::<Vec<_>>();

        let edges = snapshot
            .relationships()
            .iter()
            .map(|r| {
                let key = r.key();
                EdgeRecord {
                    source: key.source,
                    target: key.target,
                    relationship_type: r.relationship_type,
                    context: r.context.clone(),
                    strength: r.strength,
                    metadata: r.metadata.clone(),
                }
            })
            .collect::<Vec<_>>();

        Self {
            format: JSON_FORMAT_NAME.to_string(),
            version: JSON_FORMAT_VERSION,
            exported_at: Utc::now().to_rfc3339(),
            node_count: nodes.len(),
            edge_count: edges.len(),
            nodes,
            edges,
        }
    }

    /// Parse a previously exported document
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).or_code(ErrorCode::ExportFailed, "Invalid JSON export document")
    }
}

/// Serialize a snapshot to JSON
pub fn to_json(snapshot: &GraphSnapshot, pretty: bool) -> Result<String> {
    let document = GraphDocument::from_snapshot(snapshot);
    let content = if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    };
    content.or_code(ErrorCode::ExportFailed, "Failed to serialize graph to JSON")
}

/// Serialize a snapshot to GraphML
pub fn to_graphml(snapshot: &GraphSnapshot, include_metadata: bool) -> Result<String> {
    let mut writer = GraphmlWriter::new();

    writer.key("d0", "node", "name", "string");
    writer.key("d1", "node", "type", "string");
    writer.key("d2", "node", "description", "string");
    writer.key("d3", "node", "aliases", "string");
    writer.key("d5", "edge", "type", "string");
    writer.key("d6", "edge", "context", "string");
    writer.key("d7", "edge", "strength", "double");
    if include_metadata {
        writer.key("d4", "node", "metadata", "string");
        writer.key("d8", "edge", "metadata", "string");
    }

    writer.open_graph();

    for entity in snapshot.entities() {
        writer.open_element("node", &[("id", &entity.canonical_name())]);
        writer.data("d0", &entity.name);
        writer.data("d1", entity.entity_type.as_str());
        if !entity.description.is_empty() {
            writer.data("d2", &entity.description);
        }
        if !entity.aliases.is_empty() {
            writer.data("d3", &entity.aliases.join("; "));
        }
        if include_metadata && !entity.metadata.is_empty() {
            writer.data("d4", &metadata_json(&entity.metadata)?);
        }
        writer.close_element("node");
    }

    for (index, relationship) in snapshot.relationships().iter().enumerate() {
        let key = relationship.key();
        writer.open_element(
            "edge",
            &[
                ("id", &format!("e{}", index)),
                ("source", &key.source),
                ("target", &key.target),
            ],
        );
        writer.data("d5", relationship.relationship_type.as_str());
        if !relationship.context.is_empty() {
            writer.data("d6", &relationship.context);
        }
        writer.data("d7", &relationship.strength.to_string());
        if include_metadata && !relationship.metadata.is_empty() {
            writer.data("d8", &metadata_json(&relationship.metadata)?);
        }
        writer.close_element("edge");
    }

    Ok(writer.finish())
}

fn metadata_json(metadata: &Metadata) -> Result<String> {
    serde_json::to_string(metadata).or_code(ErrorCode::ExportFailed, "Failed to serialize metadata")
}

/// Minimal GraphML document builder
struct GraphmlWriter {
    buf: String,
}

impl GraphmlWriter {
    fn new() -> Self {
        let mut buf = String::new();
        buf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        buf.push_str(
            "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"http://graphml.graphdrawing.org/xmlns \
             http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd\">\n",
        );
        Self { buf }
    }

    fn key(&mut self, id: &str, domain: &str, name: &str, kind: &str) {
        let _ = writeln!(
            self.buf,
            "  <key id=\"{}\" for=\"{}\" attr.name=\"{}\" attr.type=\"{}\"/>",
            id, domain, name, kind
        );
    }

    fn open_graph(&mut self) {
        self.buf.push_str("  <graph id=\"G\" edgedefault=\"directed\">\n");
    }

    fn open_element(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        let _ = write!(self.buf, "    <{}", tag);
        for (name, value) in attrs {
            let _ = write!(self.buf, " {}=\"{}\"", name, escape_xml(value));
        }
        self.buf.push_str(">\n");
    }

    fn data(&mut self, key: &str, value: &str) {
        let _ = writeln!(self.buf, "      <data key=\"{}\">{}</data>", key, escape_xml(value));
    }

    fn close_element(&mut self, tag: &str) {
        let _ = writeln!(self.buf, "    </{}>", tag);
    }

    fn finish(mut self) -> String {
        self.buf.push_str("  </graph>\n</graphml>\n");
        self.buf
    }
}

/// Escape text for use in XML content and attribute values
fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // not representable in XML 1.0, even as character references
            c if !is_xml_char(c) => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

/// Render a snapshot in `format` and deliver it inline or to `path`
pub fn export_snapshot(
    snapshot: &GraphSnapshot,
    format: ExportFormat,
    path: Option<&Path>,
    pretty: bool,
    include_metadata: bool,
) -> Result<ExportResult> {
    let content = match format {
        ExportFormat::Json => to_json(snapshot, pretty)?,
        ExportFormat::Graphml => to_graphml(snapshot, include_metadata)?,
    };
    let size_bytes = content.len() as u64;

    let payload = match path {
        Some(path) => {
            write_file(path, &content)?;
            info!(
                format = %format,
                path = %path.display(),
                nodes = snapshot.node_count(),
                edges = snapshot.edge_count(),
                size_bytes,
                "Exported graph"
            );
            ExportPayload::File(path.to_path_buf())
        }
        None => ExportPayload::Inline(content),
    };

    Ok(ExportResult {
        format,
        node_count: snapshot.node_count(),
        edge_count: snapshot.edge_count(),
        payload,
        size_bytes,
    })
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            GraphError::new(ErrorCode::ExportFailed, "Failed to create export directory")
                .with_detail("path", parent.display())
                .with_cause(e)
        })?;
    }
    fs::write(path, content).map_err(|e| {
        GraphError::new(ErrorCode::ExportFailed, "Failed to write export file")
            .with_detail("path", path.display())
            .with_cause(e)
    })
}
