use super::{link_content, marked_ref};
use crate::engine::TagContext;
use crate::error::Result;
use crate::matcher::{find_invocation, find_xobject_name};
use crate::parse::PageInfo;
use crate::plan::BBox;
use crate::report::{linked_indicator, summarize};

const FIGURE: &str = "Figure";

pub fn tag_image(
    ctx: &mut TagContext,
    page: &PageInfo,
    bbox: Option<&BBox>,
    alt_text: &str,
    image_id: Option<&str>,
    xref: Option<u32>,
) -> Result<()> {
    let node = ctx.tree.add_child(ctx.document, FIGURE)?;
    {
        let figure = ctx.tree.node_mut(node)?;
        figure.alt = Some(alt_text.to_string());
        if let Some(xref) = xref {
            figure.correlation.push(("A11yXref".to_string(), i64::from(xref)));
        }
    }

    let mut linked = false;
    if let Some(xref) = xref {
        let mcid = ctx.mcids.next(page.number);
        linked = link_image(ctx, page, xref, mcid);
        if linked {
            ctx.tree.attach(node, marked_ref(page, mcid))?;
        }
    }

    // The MCID spent on a failed link stays unused.
    if !linked && bbox.is_some() {
        let mcid = ctx.mcids.next(page.number);
        ctx.tree.attach(node, marked_ref(page, mcid))?;
    }

    ctx.report.tagged(format!(
        "Set alt text on {} page {}: {} {}",
        image_id.unwrap_or("image"),
        page.number,
        summarize(alt_text, ctx.config.summary_chars),
        linked_indicator(linked)
    ));
    Ok(())
}

fn link_image(ctx: &mut TagContext, page: &PageInfo, xref: u32, mcid: i64) -> bool {
    let Some(name) = find_xobject_name(&ctx.doc, page.id, xref) else {
        ctx.report.warn(format!(
            "Could not find XObject name for xref {xref} on page {}",
            page.number
        ));
        return false;
    };

    let linked = link_content(ctx, page, FIGURE, mcid, |ops| find_invocation(ops, &name));
    if !linked {
        ctx.report.warn(format!(
            "Could not inject BDC/EMC for /{} on page {}",
            String::from_utf8_lossy(&name),
            page.number
        ));
    }
    linked
}
