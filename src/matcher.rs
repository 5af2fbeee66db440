//! Locate the content-stream operations that draw an element.
//!
//! Text is matched by position: every `BT … ET` object gets a position from
//! its text matrix and is compared against the target box. Images are
//! matched by identity: the XObject bound to the target object number and
//! the `Do` that paints it.

use lopdf::{Document, Object, ObjectId};
use std::ops::Range;
use tracing::{debug, trace};

use crate::geo::{multiply_matrices, translate_matrix, Rect, IDENTITY};
use crate::lexer::Operation;
use crate::logging::TAG_MATCH;
use crate::parse::{page_resources, resolve};

/// One `BT … ET` text object.
#[derive(Debug, Clone, PartialEq)]
pub struct TextObject {
    /// Byte range from the start of `BT` through the end of `ET`.
    pub span: Range<usize>,
    /// Translations set by `Tm` inside the object.
    pub tm_positions: Vec<(f64, f64)>,
    /// Position accumulated from `Td`/`TD` moves, when there were any.
    pub moved_to: Option<(f64, f64)>,
}

impl TextObject {
    /// An explicit `Tm` is authoritative. Relative moves are only consulted
    /// when the object never sets its matrix.
    pub fn overlaps(&self, area: &Rect) -> bool {
        if !self.tm_positions.is_empty() {
            return self.tm_positions.iter().any(|(x, y)| area.contains(*x, *y));
        }
        self.moved_to
            .map(|(x, y)| area.contains(x, y))
            .unwrap_or(false)
    }
}

/// Split an operation list into text objects. An unterminated `BT` at the
/// end of the stream is dropped.
pub fn text_objects(ops: &[Operation]) -> Vec<TextObject> {
    let mut objects = Vec::new();
    let mut current: Option<(TextObject, [f64; 6])> = None;

    for op in ops {
        match op.operator.as_str() {
            "BT" => {
                current = Some((
                    TextObject {
                        span: op.span.clone(),
                        tm_positions: Vec::new(),
                        moved_to: None,
                    },
                    IDENTITY,
                ));
            }
            "ET" => {
                if let Some((mut object, _)) = current.take() {
                    object.span.end = op.span.end;
                    objects.push(object);
                }
            }
            "Tm" => {
                if let (Some((object, _)), Some([_, _, _, _, e, f])) =
                    (current.as_mut(), op.numbers::<6>())
                {
                    object.tm_positions.push((e, f));
                }
            }
            "Td" | "TD" => {
                if let (Some((object, line_matrix)), Some([tx, ty])) =
                    (current.as_mut(), op.numbers::<2>())
                {
                    *line_matrix = multiply_matrices(&translate_matrix(tx, ty), line_matrix);
                    object.moved_to = Some((line_matrix[4], line_matrix[5]));
                }
            }
            _ => {}
        }
    }
    objects
}

/// Find the contiguous run of text objects that overlaps `target` grown by
/// `tolerance`. The first overlapping object starts the run, later ones
/// extend it, and the first miss after that ends it.
pub fn find_text_span(ops: &[Operation], target: &Rect, tolerance: f64) -> Option<Range<usize>> {
    let area = target.expanded(tolerance);
    let mut matched: Option<Range<usize>> = None;

    for object in text_objects(ops) {
        let hit = object.overlaps(&area);
        trace!(
            target: TAG_MATCH,
            span = ?object.span,
            tm = ?object.tm_positions,
            moved_to = ?object.moved_to,
            hit,
            "text object"
        );
        if hit {
            match matched.as_mut() {
                Some(range) => range.end = object.span.end,
                None => matched = Some(object.span.clone()),
            }
        } else if matched.is_some() {
            break;
        }
    }

    if let Some(range) = &matched {
        debug!(target: TAG_MATCH, ?range, ?target, tolerance, "matched text span");
    }
    matched
}

/// Name under which the page's `/Resources /XObject` binds object `xref`.
/// When several names point at the same object the first one wins.
pub fn find_xobject_name(doc: &Document, page_id: ObjectId, xref: u32) -> Option<Vec<u8>> {
    let resources = page_resources(doc, page_id).ok()??;
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj).ok())
        .and_then(|obj| obj.as_dict().ok())?;

    let found = xobjects.iter().find_map(|(name, value)| match value {
        Object::Reference((number, _)) if *number == xref => Some(name.clone()),
        _ => None,
    });
    debug!(
        target: TAG_MATCH,
        ?page_id,
        xref,
        name = ?found.as_deref().map(String::from_utf8_lossy),
        "resolved image xobject"
    );
    found
}

/// Span of the first `/name Do` invocation.
pub fn find_invocation(ops: &[Operation], name: &[u8]) -> Option<Range<usize>> {
    ops.iter()
        .find(|op| op.operator == "Do" && op.last_name() == Some(name))
        .map(|op| op.span.clone())
}
