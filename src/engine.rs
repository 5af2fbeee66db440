use lopdf::Document;
use std::path::Path;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::TaggerConfig;
use crate::error::{Result, TaggingError};
use crate::logging::TAG_RUN;
use crate::mcid::McidAllocator;
use crate::metadata::apply_metadata;
use crate::parse::{load_pdf, page_at, PageInfo};
use crate::plan::{group_by_page, Element, ElementKind, Plan};
use crate::report::TagReport;
use crate::structure::{NodeId, StructTree};
use crate::tagger::{tag_heading, tag_image, tag_link, tag_table};

/// State owned by one tagging run and threaded through every tagger.
pub struct TagContext<'a> {
    pub doc: Document,
    pub tree: StructTree,
    pub mcids: McidAllocator,
    pub report: &'a mut TagReport,
    pub config: &'a TaggerConfig,
    /// The top-level `Document` structure node.
    pub document: NodeId,
}

impl<'a> TagContext<'a> {
    pub fn new(doc: Document, config: &'a TaggerConfig, report: &'a mut TagReport) -> Self {
        let mut tree = StructTree::new();
        let document = tree.add_top_level();
        TagContext {
            doc,
            tree,
            mcids: McidAllocator::new(),
            report,
            config,
            document,
        }
    }
}

/// Run a plan end to end. Never panics on bad input; every failure ends up
/// in the returned report.
pub fn apply_plan(plan: &Plan, config: &TaggerConfig) -> TagReport {
    let run_id = Uuid::new_v4();
    let span = info_span!(target: TAG_RUN, "tag_run", %run_id);
    let _enter = span.enter();
    info!(
        target: TAG_RUN,
        input = %plan.input_path.display(),
        output = %plan.output_path.display(),
        elements = plan.elements.len(),
        "starting tagging run"
    );

    let mut report = TagReport::new();

    if let Err(e) = copy_input(&plan.input_path, &plan.output_path) {
        report.fail(format!("Failed to copy input to output: {e}"));
        return report;
    }

    match tag_document(plan, config, &mut report) {
        Ok(()) => report.succeed(&plan.output_path),
        Err(e) => report.fail(format!("Failed to process PDF: {e}")),
    }

    info!(
        target: TAG_RUN,
        success = report.success,
        tags_applied = report.tags_applied,
        warnings = report.warnings.len(),
        "finished tagging run"
    );
    report
}

fn copy_input(input: &Path, output: &Path) -> Result<()> {
    if let (Ok(a), Ok(b)) = (input.canonicalize(), output.canonicalize()) {
        if a == b {
            return Ok(());
        }
    }
    std::fs::copy(input, output)?;
    Ok(())
}

fn tag_document(plan: &Plan, config: &TaggerConfig, report: &mut TagReport) -> Result<()> {
    let doc = load_pdf(&plan.output_path)?;
    let mut ctx = TagContext::new(doc, config, report);

    for (page_index, elements) in group_by_page(&plan.elements) {
        let page = match page_at(&ctx.doc, page_index) {
            Ok(page) => page,
            Err(TaggingError::PageOutOfRange(number)) => {
                warn!(target: TAG_RUN, page = number, "page out of range");
                ctx.report.warn(format!("Page {number} out of range, skipping"));
                continue;
            }
            Err(e) => {
                for element in elements {
                    ctx.report.warn(format!(
                        "Failed to tag {} on page {}: {e}",
                        element.kind.type_name(),
                        page_index.saturating_add(1)
                    ));
                }
                continue;
            }
        };

        for element in elements {
            if let Err(e) = tag_element(&mut ctx, &page, element) {
                warn!(target: TAG_RUN, page = page.number, error = %e, "element failed");
                ctx.report.warn(format!(
                    "Failed to tag {} on page {}: {e}",
                    element.kind.type_name(),
                    page.number
                ));
            }
        }
    }

    if let Some(metadata) = &plan.metadata {
        apply_metadata(&mut ctx.doc, metadata, ctx.report, config.summary_chars);
    }

    let warnings = ctx.tree.write(&mut ctx.doc)?;
    for warning in warnings {
        ctx.report.warn(warning);
    }

    save_atomically(&mut ctx.doc, &plan.output_path)
}

fn tag_element(ctx: &mut TagContext, page: &PageInfo, element: &Element) -> Result<()> {
    let bbox = element.bbox.as_ref();
    match &element.kind {
        ElementKind::Heading { level, text } => tag_heading(ctx, page, bbox, *level, text),
        ElementKind::Image {
            alt_text,
            image_id,
            xref,
        } => tag_image(ctx, page, bbox, alt_text, image_id.as_deref(), *xref),
        ElementKind::Table {
            table_id,
            header_rows,
            rows,
        } => tag_table(ctx, page, bbox, table_id.as_deref(), *header_rows, rows),
        ElementKind::Link {
            link_id, link_text, ..
        } => tag_link(ctx, page, link_id.as_deref(), link_text),
        ElementKind::Unknown(kind) => {
            ctx.report.warn(format!("Unknown element type: {kind}"));
            Ok(())
        }
    }
}

/// Save next to the destination and rename into place, so a failed save
/// leaves the existing file untouched. The destination's permissions carry
/// over to the new file.
fn save_atomically(doc: &mut Document, output: &Path) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    doc.save_to(&mut tmp)?;
    if let Ok(existing) = std::fs::metadata(output) {
        tmp.as_file().set_permissions(existing.permissions())?;
    }
    tmp.persist(output).map_err(|e| e.error)?;
    Ok(())
}
