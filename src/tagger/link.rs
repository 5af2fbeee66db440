use crate::engine::TagContext;
use crate::error::Result;
use crate::parse::PageInfo;
use crate::report::{linked_indicator, summarize};

/// Links are structure-only: their text usually sits inside a larger text
/// run, so no content is wrapped.
pub fn tag_link(
    ctx: &mut TagContext,
    page: &PageInfo,
    link_id: Option<&str>,
    link_text: &str,
) -> Result<()> {
    let id = ctx.tree.add_child(ctx.document, "Link")?;
    let node = ctx.tree.node_mut(id)?;
    node.alt = Some(link_text.to_string());
    node.actual_text = Some(link_text.to_string());

    ctx.report.tagged(format!(
        "Set link text on {} page {}: {} {}",
        link_id.unwrap_or("link"),
        page.number,
        summarize(link_text, ctx.config.summary_chars),
        linked_indicator(false)
    ));
    Ok(())
}
