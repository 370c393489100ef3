//! Package-level decoding and object indexing
//!
//! Every top-level record is an "object". Two well-known child ids carry the
//! object's class and name; string leaves ending in `.rws` are model
//! references.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;

use crate::chunk::{read_u32, scan};
use crate::container::{decode_forest, Node, RecordId};
use crate::{LvlError, Result, BZPK_MAGIC, HEADER_SIZE};

/// Child id holding the object's class name
pub const CLASS_ID: u32 = 0x2000_0000;

/// Child id holding the object's instance name
pub const NAME_ID: u32 = 0x8000_0000;

/// Strings with this suffix (case-insensitive) are collected as references
pub const REFERENCE_SUFFIX: &str = ".rws";

/// Semantic role carried by a well-known child id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Class,
    Name,
}

const WELL_KNOWN_IDS: &[(u32, Role)] = &[(CLASS_ID, Role::Class), (NAME_ID, Role::Name)];

impl Role {
    pub fn of(id: RecordId) -> Option<Role> {
        WELL_KNOWN_IDS
            .iter()
            .find(|(known, _)| *known == id.as_u32())
            .map(|&(_, role)| role)
    }
}

pub fn is_reference(s: &str) -> bool {
    s.to_ascii_lowercase().ends_with(REFERENCE_SUFFIX)
}

/// Index entry for one top-level object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSummary {
    pub index: usize,
    pub offset: usize,
    pub size: u32,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub name: Option<String>,
    /// Sorted, deduplicated model references
    #[serde(rename = "rws_refs")]
    pub references: Vec<String>,
    pub string_count: usize,
    pub node: Node,
}

impl ObjectSummary {
    pub fn new(index: usize, node: Node) -> Self {
        let mut class_name = None;
        let mut name = None;

        // Direct children only, first match per role
        for child in node.children() {
            let (Some(role), Some(text)) =
                (Role::of(child.id), child.value().and_then(|v| v.as_str()))
            else {
                continue;
            };
            let slot = match role {
                Role::Class => &mut class_name,
                Role::Name => &mut name,
            };
            if slot.is_none() {
                *slot = Some(text.to_string());
            }
        }

        let mut string_count = 0;
        let mut references = BTreeSet::new();
        node.for_each_string(&mut |s| {
            string_count += 1;
            if is_reference(s) {
                references.insert(s.to_string());
            }
        });

        Self {
            index,
            offset: node.offset,
            size: node.size,
            class_name,
            name,
            references: references.into_iter().collect(),
            string_count,
            node,
        }
    }
}

/// Per-file summary written next to the object list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageSummary {
    pub file: String,
    pub declared_size: u32,
    pub actual_size: usize,
    pub size_matches: bool,
    pub header_unknown: u32,
    pub header_object_count: u32,
    pub parsed_object_count: usize,
    pub parse_final_offset: usize,
    pub unique_rws_refs: Vec<String>,
    pub string_count: usize,
}

/// JSON document for one package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDocument {
    pub summary: PackageSummary,
    pub objects: Vec<ObjectSummary>,
}

/// A decoded .LVL package
#[derive(Debug, Clone, PartialEq)]
pub struct PackageFile {
    pub magic: [u8; 4],
    pub declared_size: u32,
    /// Unknown header word, passed through verbatim
    pub reserved: u32,
    pub declared_count: u32,
    pub actual_size: usize,
    pub objects: Vec<ObjectSummary>,
    /// Cursor after the last top-level record and trailing padding
    pub final_offset: usize,
}

impl PackageFile {
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    /// Decode a whole package. A malformed top-level record aborts the parse.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(LvlError::Format("File too small".into()));
        }
        if data[..4] != BZPK_MAGIC {
            return Err(LvlError::Format("Missing BZPK header".into()));
        }

        let declared_size = read_u32(data, 4);
        let reserved = read_u32(data, 8);
        let declared_count = read_u32(data, 12);

        let top = scan(data, HEADER_SIZE, data.len())?;
        let objects = decode_forest(data, &top.records)
            .into_iter()
            .enumerate()
            .map(|(i, node)| ObjectSummary::new(i, node))
            .collect();

        let package = Self {
            magic: BZPK_MAGIC,
            declared_size,
            reserved,
            declared_count,
            actual_size: data.len(),
            objects,
            final_offset: top.end,
        };

        if !package.size_matches() {
            tracing::debug!(
                "declared size {} differs from actual size {}",
                declared_size,
                data.len()
            );
        }
        Ok(package)
    }

    pub fn size_matches(&self) -> bool {
        self.declared_size as usize == self.actual_size
    }

    /// Union of all objects' references, sorted
    pub fn unique_references(&self) -> Vec<String> {
        self.objects
            .iter()
            .flat_map(|o| o.references.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn string_count(&self) -> usize {
        self.objects.iter().map(|o| o.string_count).sum()
    }

    pub fn summary(&self, file: &str) -> PackageSummary {
        PackageSummary {
            file: file.to_string(),
            declared_size: self.declared_size,
            actual_size: self.actual_size,
            size_matches: self.size_matches(),
            header_unknown: self.reserved,
            header_object_count: self.declared_count,
            parsed_object_count: self.objects.len(),
            parse_final_offset: self.final_offset,
            unique_rws_refs: self.unique_references(),
            string_count: self.string_count(),
        }
    }

    pub fn into_document(self, file: &str) -> PackageDocument {
        PackageDocument {
            summary: self.summary(file),
            objects: self.objects,
        }
    }

    /// Summary string for logging
    pub fn info_line(&self) -> String {
        format!(
            "objects={} (declared {}) rws_refs={} strings={} end=0x{:X}",
            self.objects.len(),
            self.declared_count,
            self.unique_references().len(),
            self.string_count(),
            self.final_offset,
        )
    }
}
