//! Logical structure tree.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Nothing is
//! written into the PDF until [`StructTree::write`] runs at the end of a
//! tagging run, which materializes every node as a `StructElem`, rebuilds the
//! parent tree and marks the catalog as tagged.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::error::{Result, TaggingError};
use crate::logging::TAG_STRUCT;
use crate::parse::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Marked content on a page that a structure element owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkedContentRef {
    pub page_id: ObjectId,
    /// 1-based page number.
    pub page_number: u32,
    pub mcid: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructNode {
    pub tag: String,
    pub alt: Option<String>,
    pub actual_text: Option<String>,
    /// Table header scope, e.g. `Column`.
    pub scope: Option<String>,
    pub col_span: Option<u32>,
    /// Integer attributes written directly on the element, used to correlate
    /// it with the producer's records.
    pub correlation: Vec<(String, i64)>,
    pub children: Vec<NodeId>,
    pub marked: Vec<MarkedContentRef>,
    parent: Option<NodeId>,
}

impl StructNode {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        StructNode {
            tag: tag.to_string(),
            parent,
            ..Default::default()
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

#[derive(Debug, Default)]
pub struct StructTree {
    nodes: Vec<StructNode>,
    document: Option<NodeId>,
}

impl StructTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single top-level `Document` node, created on first call.
    pub fn add_top_level(&mut self) -> NodeId {
        if let Some(id) = self.document {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(StructNode::new("Document", None));
        self.document = Some(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
        let id = NodeId(self.nodes.len());
        self.node_mut(parent)?.children.push(id);
        self.nodes.push(StructNode::new(tag, Some(parent)));
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&StructNode> {
        self.nodes.get(id.0).ok_or(TaggingError::InvalidNode(id.0))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut StructNode> {
        self.nodes.get_mut(id.0).ok_or(TaggingError::InvalidNode(id.0))
    }

    pub fn attach(&mut self, id: NodeId, mcr: MarkedContentRef) -> Result<()> {
        self.node_mut(id)?.marked.push(mcr);
        Ok(())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Write the tree into `doc`, extending an existing structure tree root
    /// if the document already has one. Returns warnings for anything that
    /// had to be replaced rather than merged.
    pub fn write(&self, doc: &mut Document) -> Result<Vec<String>> {
        let mut warnings = Vec::new();
        let Some(document) = self.document else {
            return Ok(warnings);
        };

        let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
        let root_id = struct_tree_root(doc, catalog_id)?;

        let elem_ids: Vec<ObjectId> = self.nodes.iter().map(|_| doc.new_object_id()).collect();
        for (index, node) in self.nodes.iter().enumerate() {
            let parent_ref = node.parent.map(|p| elem_ids[p.0]).unwrap_or(root_id);
            let elem = self.struct_elem(node, parent_ref, &elem_ids);
            doc.objects.insert(elem_ids[index], Object::Dictionary(elem));
        }

        // page -> MCID-indexed owners
        let mut pages: BTreeMap<ObjectId, (u32, Vec<Option<ObjectId>>)> = BTreeMap::new();
        for (index, node) in self.nodes.iter().enumerate() {
            for mcr in &node.marked {
                let (_, owners) = pages.entry(mcr.page_id).or_insert((mcr.page_number, Vec::new()));
                let slot = mcr.mcid as usize;
                if owners.len() <= slot {
                    owners.resize(slot + 1, None);
                }
                owners[slot] = Some(elem_ids[index]);
            }
        }

        let (mut nums, mut next_key) = existing_parent_tree(doc, root_id, &mut warnings)?;
        for (page_id, (page_number, owners)) in pages {
            let array: Vec<Object> = owners
                .into_iter()
                .map(|owner| owner.map(Object::Reference).unwrap_or(Object::Null))
                .collect();
            let array_id = doc.add_object(Object::Array(array));
            nums.push(Object::Integer(next_key));
            nums.push(Object::Reference(array_id));

            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            if let Ok(previous) = page.get(b"StructParents").and_then(Object::as_i64) {
                warnings.push(format!(
                    "Page {page_number} already had StructParents {previous}; replaced"
                ));
            }
            page.set("StructParents", Object::Integer(next_key));
            page.set("Tabs", Object::Name(b"S".to_vec()));
            debug!(target: TAG_STRUCT, page_number, key = next_key, "registered page in parent tree");
            next_key += 1;
        }
        let parent_tree_id = doc.add_object(dictionary! { "Nums" => nums });

        let mut kids = existing_kids(doc, root_id)?;
        kids.push(Object::Reference(elem_ids[document.0]));
        let root = doc.get_object_mut(root_id)?.as_dict_mut()?;
        root.set("Type", Object::Name(b"StructTreeRoot".to_vec()));
        root.set("K", Object::Array(kids));
        root.set("ParentTree", Object::Reference(parent_tree_id));
        root.set("ParentTreeNextKey", Object::Integer(next_key));

        let catalog = doc.get_object_mut(catalog_id)?.as_dict_mut()?;
        let mut mark_info = match catalog.get(b"MarkInfo") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        mark_info.set("Marked", Object::Boolean(true));
        catalog.set("MarkInfo", Object::Dictionary(mark_info));
        catalog.set("StructTreeRoot", Object::Reference(root_id));

        info!(
            target: TAG_STRUCT,
            elements = self.nodes.len(),
            next_key,
            "wrote structure tree"
        );
        Ok(warnings)
    }

    fn struct_elem(&self, node: &StructNode, parent_ref: ObjectId, elem_ids: &[ObjectId]) -> Dictionary {
        let mut elem = dictionary! {
            "Type" => "StructElem",
            "S" => Object::Name(node.tag.as_bytes().to_vec()),
            "P" => parent_ref,
        };

        let page = node.marked.first().map(|mcr| mcr.page_id);
        if let Some(page_id) = page {
            elem.set("Pg", Object::Reference(page_id));
        }

        let mut kids: Vec<Object> = node
            .marked
            .iter()
            .map(|mcr| {
                if Some(mcr.page_id) == page {
                    Object::Integer(mcr.mcid)
                } else {
                    Object::Dictionary(dictionary! {
                        "Type" => "MCR",
                        "Pg" => mcr.page_id,
                        "MCID" => mcr.mcid,
                    })
                }
            })
            .collect();
        kids.extend(node.children.iter().map(|child| Object::Reference(elem_ids[child.0])));
        match kids.len() {
            0 => {}
            1 => elem.set("K", kids.remove(0)),
            _ => elem.set("K", Object::Array(kids)),
        }

        if let Some(alt) = &node.alt {
            elem.set("Alt", pdf_text_string(alt));
        }
        if let Some(text) = &node.actual_text {
            elem.set("ActualText", pdf_text_string(text));
        }
        if node.scope.is_some() || node.col_span.is_some() {
            let mut attrs = dictionary! { "O" => "Table" };
            if let Some(scope) = &node.scope {
                attrs.set("Scope", Object::Name(scope.as_bytes().to_vec()));
            }
            if let Some(span) = node.col_span {
                attrs.set("ColSpan", Object::Integer(span as i64));
            }
            elem.set("A", Object::Dictionary(attrs));
        }
        for (key, value) in &node.correlation {
            elem.set(key.as_bytes().to_vec(), Object::Integer(*value));
        }
        elem
    }
}

/// Object id of the catalog's structure tree root, creating one if missing.
/// An inline root dictionary is moved into its own object.
fn struct_tree_root(doc: &mut Document, catalog_id: ObjectId) -> Result<ObjectId> {
    let existing = doc.get_dictionary(catalog_id)?.get(b"StructTreeRoot").ok().cloned();
    match existing {
        Some(Object::Reference(id)) if doc.get_dictionary(id).is_ok() => {
            info!(target: TAG_STRUCT, ?id, "extending existing structure tree");
            Ok(id)
        }
        Some(Object::Dictionary(dict)) => Ok(doc.add_object(dict)),
        _ => Ok(doc.add_object(dictionary! { "Type" => "StructTreeRoot" })),
    }
}

fn existing_kids(doc: &Document, root_id: ObjectId) -> Result<Vec<Object>> {
    Ok(match doc.get_dictionary(root_id)?.get(b"K") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(items) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Null) | Err(_) => Vec::new(),
        Ok(other) => vec![other.clone()],
    })
}

/// Flat `/Nums` entries and the next free key of an existing parent tree.
fn existing_parent_tree(
    doc: &Document,
    root_id: ObjectId,
    warnings: &mut Vec<String>,
) -> Result<(Vec<Object>, i64)> {
    let root = doc.get_dictionary(root_id)?;
    let declared_next = root
        .get(b"ParentTreeNextKey")
        .and_then(Object::as_i64)
        .unwrap_or(0);

    let Some(tree) = root
        .get(b"ParentTree")
        .ok()
        .and_then(|obj| resolve(doc, obj).ok())
        .and_then(|obj| obj.as_dict().ok())
    else {
        return Ok((Vec::new(), declared_next.max(0)));
    };

    if tree.has(b"Kids") {
        let message = "Existing parent tree uses Kids and could not be merged; replaced".to_string();
        warn!(target: TAG_STRUCT, "{message}");
        warnings.push(message);
        return Ok((Vec::new(), declared_next.max(0)));
    }

    let nums = match tree.get(b"Nums").ok().and_then(|obj| resolve(doc, obj).ok()) {
        Some(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let max_key = nums
        .iter()
        .step_by(2)
        .filter_map(|key| key.as_i64().ok())
        .max()
        .map(|k| k + 1)
        .unwrap_or(0);
    Ok((nums, declared_next.max(max_key).max(0)))
}

/// Encode a text string: a literal when plain ASCII, UTF-16BE with a byte
/// order mark otherwise.
pub fn pdf_text_string(text: &str) -> Object {
    if text.bytes().all(|b| (0x20..0x7f).contains(&b) || b == b'\n' || b == b'\t') {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
