//! Per-element taggers.
//!
//! Each tagger adds its structure element under the run's `Document` node,
//! tries to tie it to the operations that draw it, and falls back to a
//! structure-only element when that fails.

mod heading;
mod image;
mod link;
mod table;

pub use heading::{heading_tag, tag_heading};
pub use image::tag_image;
pub use link::tag_link;
pub use table::tag_table;

use std::ops::Range;
use tracing::{debug, warn};

use crate::engine::TagContext;
use crate::error::Result;
use crate::lexer::{tokenize, Operation};
use crate::logging::TAG_MATCH;
use crate::parse::{append_content_stream, content_stream_ids, read_content, write_content, PageInfo};
use crate::rewriter::{placeholder_sequence, wrap_span};
use crate::structure::MarkedContentRef;

pub(crate) fn marked_ref(page: &PageInfo, mcid: i64) -> MarkedContentRef {
    MarkedContentRef {
        page_id: page.id,
        page_number: page.number,
        mcid,
    }
}

/// Wrap the first span `locate` finds, searching the page's content streams
/// in order. Returns whether a stream was rewritten.
///
/// Streams that fail to decode or tokenize are skipped. A failed rewrite or
/// write-back counts as no match.
pub(crate) fn link_content<F>(
    ctx: &mut TagContext,
    page: &PageInfo,
    tag: &str,
    mcid: i64,
    locate: F,
) -> bool
where
    F: Fn(&[Operation]) -> Option<Range<usize>>,
{
    for stream_id in content_stream_ids(&ctx.doc, page.id) {
        let content = match read_content(&ctx.doc, stream_id) {
            Ok(content) => content,
            Err(e) => {
                warn!(target: TAG_MATCH, ?stream_id, error = %e, "cannot decode content stream");
                continue;
            }
        };
        let ops = match tokenize(&content) {
            Ok(ops) => ops,
            Err(e) => {
                warn!(target: TAG_MATCH, ?stream_id, error = %e, "cannot tokenize content stream");
                continue;
            }
        };
        let Some(span) = locate(&ops) else {
            continue;
        };
        let rewritten = match wrap_span(&content, span, tag, mcid) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(target: TAG_MATCH, error = %e, "treating failed rewrite as no match");
                return false;
            }
        };
        return match write_content(&mut ctx.doc, stream_id, rewritten, ctx.config.recompress_streams) {
            Ok(()) => true,
            Err(e) => {
                warn!(target: TAG_MATCH, ?stream_id, error = %e, "cannot write content stream");
                false
            }
        };
    }
    false
}

/// Append a placeholder marked-content sequence to the page's last content
/// stream. A page with no stream, or whose last stream cannot be decoded,
/// gets a new stream instead.
pub(crate) fn append_placeholder(
    ctx: &mut TagContext,
    page: &PageInfo,
    tag: &str,
    mcid: i64,
) -> Result<()> {
    let sequence = placeholder_sequence(tag, mcid)?;
    let last = content_stream_ids(&ctx.doc, page.id)
        .last()
        .copied()
        .and_then(|stream_id| match read_content(&ctx.doc, stream_id) {
            Ok(content) => Some((stream_id, content)),
            Err(e) => {
                warn!(target: TAG_MATCH, ?stream_id, error = %e, "cannot decode last content stream");
                None
            }
        });
    match last {
        Some((stream_id, mut content)) => {
            content.extend_from_slice(&sequence);
            write_content(&mut ctx.doc, stream_id, content, ctx.config.recompress_streams)?;
        }
        None => {
            append_content_stream(&mut ctx.doc, page.id, sequence)?;
        }
    }
    Ok(())
}
