use lopdf::{Dictionary, Document, Object};
use tracing::{debug, warn};

use crate::error::Result;
use crate::logging::TAG_STRUCT;
use crate::plan::Metadata;
use crate::report::{summarize, TagReport};
use crate::structure::pdf_text_string;

/// Apply document title and language. Failures become warnings; metadata
/// never aborts a run.
pub fn apply_metadata(doc: &mut Document, metadata: &Metadata, report: &mut TagReport, summary_chars: usize) {
    if let Some(title) = metadata.title.as_deref().filter(|t| !t.is_empty()) {
        match set_title(doc, title) {
            Ok(()) => report.change(format!("Set title: {}", summarize(title, summary_chars))),
            Err(e) => metadata_warning(report, e),
        }
    }
    if let Some(language) = metadata.language.as_deref().filter(|l| !l.is_empty()) {
        match set_language(doc, language) {
            Ok(()) => report.change(format!("Set language: {language}")),
            Err(e) => metadata_warning(report, e),
        }
    }
}

fn metadata_warning(report: &mut TagReport, e: impl std::fmt::Display) {
    warn!(target: TAG_STRUCT, error = %e, "metadata update failed");
    report.warn(format!("Metadata error: {e}"));
}

fn set_title(doc: &mut Document, title: &str) -> Result<()> {
    match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => {
            let id = *id;
            doc.get_object_mut(id)?
                .as_dict_mut()?
                .set("Title", pdf_text_string(title));
        }
        Ok(Object::Dictionary(_)) => {
            doc.trailer
                .get_mut(b"Info")?
                .as_dict_mut()?
                .set("Title", pdf_text_string(title));
        }
        _ => {
            let mut info = Dictionary::new();
            info.set("Title", pdf_text_string(title));
            let id = doc.add_object(info);
            doc.trailer.set("Info", Object::Reference(id));
        }
    }

    let catalog = catalog_mut(doc)?;
    let prefs_ref = match catalog.get(b"ViewerPreferences") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    match prefs_ref {
        Some(id) => {
            doc.get_object_mut(id)?
                .as_dict_mut()?
                .set("DisplayDocTitle", Object::Boolean(true));
        }
        None => {
            let mut prefs = match catalog.get(b"ViewerPreferences") {
                Ok(Object::Dictionary(dict)) => dict.clone(),
                _ => Dictionary::new(),
            };
            prefs.set("DisplayDocTitle", Object::Boolean(true));
            catalog.set("ViewerPreferences", Object::Dictionary(prefs));
        }
    }
    debug!(target: TAG_STRUCT, title, "set document title");
    Ok(())
}

fn set_language(doc: &mut Document, language: &str) -> Result<()> {
    catalog_mut(doc)?.set("Lang", pdf_text_string(language));
    debug!(target: TAG_STRUCT, language, "set document language");
    Ok(())
}

fn catalog_mut(doc: &mut Document) -> Result<&mut Dictionary> {
    let id = doc.trailer.get(b"Root")?.as_reference()?;
    Ok(doc.get_object_mut(id)?.as_dict_mut()?)
}
