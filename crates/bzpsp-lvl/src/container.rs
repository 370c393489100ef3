//! Container / leaf disambiguation for top-level records
//!
//! Nothing in the format marks a payload as a nested record sequence. A
//! top-level payload is taken as a container only when scanning it yields at
//! least one record and consumes the payload exactly (trailing zero padding
//! allowed). Children are always leaves; deeper nesting is not attempted.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::chunk::{scan, Record};
use crate::payload::{classify, DecodedValue, Payload};

/// A 32-bit record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub u32);

impl RecordId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn as_i32(&self) -> i32 {
        self.0 as i32
    }

    pub fn hex(&self) -> String {
        format!("0x{:08X}", self.0)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("RecordId", 3)?;
        s.serialize_field("id_u32", &self.as_u32())?;
        s.serialize_field("id_i32", &self.as_i32())?;
        s.serialize_field("id_hex", &self.hex())?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeBody {
    #[serde(rename = "children")]
    Container(Vec<Node>),
    #[serde(rename = "value")]
    Leaf(Payload),
}

/// A decoded record. Owns its payload; holds no reference to the source buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub offset: usize,
    pub size: u32,
    #[serde(flatten)]
    pub id: RecordId,
    #[serde(flatten)]
    pub body: NodeBody,
}

impl Node {
    pub fn leaf(data: &[u8], record: &Record) -> Self {
        Self {
            offset: record.offset,
            size: record.size,
            id: RecordId(record.id),
            body: NodeBody::Leaf(classify(record.payload(data))),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.body, NodeBody::Container(_))
    }

    /// Direct children; empty for leaves
    pub fn children(&self) -> &[Node] {
        match &self.body {
            NodeBody::Container(children) => children,
            NodeBody::Leaf(_) => &[],
        }
    }

    pub fn value(&self) -> Option<&DecodedValue> {
        match &self.body {
            NodeBody::Leaf(payload) => Some(&payload.value),
            NodeBody::Container(_) => None,
        }
    }

    /// Visit every string leaf, depth first, in record order
    pub fn for_each_string<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match &self.body {
            NodeBody::Leaf(payload) => {
                if let Some(s) = payload.value.as_str() {
                    f(s);
                }
            }
            NodeBody::Container(children) => {
                for child in children {
                    child.for_each_string(f);
                }
            }
        }
    }
}

/// Scan a record's payload as nested records, accepting only a complete,
/// non-empty decomposition
pub fn try_children(data: &[u8], record: &Record) -> Option<Vec<Record>> {
    let scan = scan(data, record.payload_start(), record.payload_end()).ok()?;
    if scan.records.is_empty() || scan.end != record.payload_end() {
        return None;
    }
    Some(scan.records)
}

/// Decode a top-level record, deciding between container and leaf
pub fn decode_record(data: &[u8], record: &Record) -> Node {
    match try_children(data, record) {
        Some(children) => {
            tracing::trace!(
                "record at 0x{:X} is a container with {} children",
                record.offset,
                children.len()
            );
            Node {
                offset: record.offset,
                size: record.size,
                id: RecordId(record.id),
                body: NodeBody::Container(
                    children.iter().map(|child| Node::leaf(data, child)).collect(),
                ),
            }
        }
        None => Node::leaf(data, record),
    }
}

/// Decode a forest of top-level records
pub fn decode_forest(data: &[u8], records: &[Record]) -> Vec<Node> {
    let nodes: Vec<Node> = records.iter().map(|r| decode_record(data, r)).collect();
    tracing::debug!(
        "decoded {} records ({} containers)",
        nodes.len(),
        nodes.iter().filter(|n| n.is_container()).count()
    );
    nodes
}
