use tracing::debug;

use super::marked_ref;
use crate::engine::TagContext;
use crate::error::Result;
use crate::logging::TAG_STRUCT;
use crate::parse::PageInfo;
use crate::plan::{BBox, TableRow};
use crate::report::linked_indicator;

pub fn tag_table(
    ctx: &mut TagContext,
    page: &PageInfo,
    bbox: Option<&BBox>,
    table_id: Option<&str>,
    header_rows: usize,
    rows: &[TableRow],
) -> Result<()> {
    let table = ctx.tree.add_child(ctx.document, "Table")?;
    let mut row_count = 0;
    let mut cell_count = 0;

    if rows.is_empty() {
        if bbox.is_some() {
            let mcid = ctx.mcids.next(page.number);
            ctx.tree.attach(table, marked_ref(page, mcid))?;
        }
    } else {
        // Header rows count plan rows, including ones skipped for having no cells.
        for (index, row) in rows.iter().enumerate() {
            if row.cells.is_empty() {
                continue;
            }
            let header = index < header_rows;
            let tr = ctx.tree.add_child(table, "TR")?;
            for cell in &row.cells {
                let id = ctx.tree.add_child(tr, if header { "TH" } else { "TD" })?;
                let node = ctx.tree.node_mut(id)?;
                node.actual_text = Some(cell.text.clone());
                if header {
                    node.scope = Some("Column".to_string());
                }
                if cell.span() > 1 {
                    node.col_span = Some(cell.span());
                }
                cell_count += 1;
            }
            row_count += 1;
        }
    }

    debug!(target: TAG_STRUCT, page = page.number, row_count, cell_count, "built table");
    ctx.report.tagged(format!(
        "Tagged table {} on page {} with {header_rows} header row(s) ({row_count} rows, {cell_count} cells) {}",
        table_id.unwrap_or(""),
        page.number,
        linked_indicator(false)
    ));
    Ok(())
}
