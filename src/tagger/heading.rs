use tracing::{debug, warn};

use super::{append_placeholder, link_content, marked_ref};
use crate::engine::TagContext;
use crate::error::Result;
use crate::logging::TAG_MATCH;
use crate::matcher::find_text_span;
use crate::parse::PageInfo;
use crate::plan::BBox;
use crate::report::{linked_indicator, summarize};

/// `H1` … `H6`; out-of-range levels are clamped.
pub fn heading_tag(level: i64) -> String {
    format!("H{}", level.clamp(1, 6))
}

pub fn tag_heading(
    ctx: &mut TagContext,
    page: &PageInfo,
    bbox: Option<&BBox>,
    level: i64,
    text: &str,
) -> Result<()> {
    let tag = heading_tag(level);
    let node = ctx.tree.add_child(ctx.document, &tag)?;

    let mut linked = false;
    if let Some(bbox) = bbox {
        let mcid = ctx.mcids.next(page.number);
        let target = bbox.to_pdf_rect(page.height);
        let tolerance = ctx.config.bbox_tolerance;
        linked = link_content(ctx, page, &tag, mcid, |ops| {
            find_text_span(ops, &target, tolerance)
        });
        if linked {
            ctx.tree.attach(node, marked_ref(page, mcid))?;
        } else {
            debug!(target: TAG_MATCH, page = page.number, %bbox, "no text object at heading position");
        }
    }

    if !linked {
        ctx.tree.node_mut(node)?.actual_text = Some(text.to_string());
        let mcid = ctx.mcids.next(page.number);
        match append_placeholder(ctx, page, &tag, mcid) {
            Ok(()) => ctx.tree.attach(node, marked_ref(page, mcid))?,
            Err(e) => {
                warn!(target: TAG_MATCH, page = page.number, error = %e, "placeholder injection failed");
                ctx.report
                    .warn(format!("Heading BDC injection failed: {e}"));
            }
        }
    }

    ctx.report.tagged(format!(
        "Tagged heading {tag} on page {}: {} {}",
        page.number,
        summarize(text, ctx.config.summary_chars),
        linked_indicator(linked)
    ));
    Ok(())
}
