#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Once;

use pdf_ua_tagger::{apply_plan, Plan, TagReport, TaggerConfig};

static INIT: Once = Once::new();

/// Route library logs through the test harness once per test binary.
pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn plan_json(input: &Path, output: &Path, elements: Value) -> Value {
    json!({
        "input_path": input,
        "output_path": output,
        "elements": elements,
    })
}

pub fn write_plan(dir: &Path, plan: &Value) -> PathBuf {
    let path = dir.join("plan.json");
    std::fs::write(&path, serde_json::to_string_pretty(plan).unwrap()).unwrap();
    path
}

/// Parse and run a plan with the default configuration.
pub fn run_plan(plan: &Value) -> TagReport {
    setup();
    let plan = Plan::from_json(&plan.to_string()).unwrap();
    apply_plan(&plan, &TaggerConfig::default())
}

pub fn load(path: &Path) -> Document {
    Document::load(path).unwrap()
}

pub fn catalog(doc: &Document) -> &Dictionary {
    let id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    doc.get_dictionary(id).unwrap()
}

/// All structure elements in the document, in object-number order.
pub fn struct_elems(doc: &Document) -> Vec<(ObjectId, &Dictionary)> {
    doc.objects
        .iter()
        .filter_map(|(id, obj)| obj.as_dict().ok().map(|d| (*id, d)))
        .filter(|(_, d)| d.get(b"Type").and_then(Object::as_name).ok() == Some(b"StructElem".as_slice()))
        .collect()
}

pub fn elems_with_tag<'a>(doc: &'a Document, tag: &str) -> Vec<(ObjectId, &'a Dictionary)> {
    struct_elems(doc)
        .into_iter()
        .filter(|(_, d)| d.get(b"S").and_then(Object::as_name).ok() == Some(tag.as_bytes()))
        .collect()
}

/// Decoded content of a page (1-based), all streams concatenated.
pub fn page_content(doc: &Document, page_number: u32) -> String {
    let page_id = doc.get_pages()[&page_number];
    let bytes = doc.get_page_content(page_id).unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Text string value, handling the UTF-16BE form.
pub fn text_string(obj: &Object) -> String {
    let bytes = obj.as_str().unwrap();
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).unwrap()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// MCIDs referenced by an element's `/K`, whether written as integers or
/// as marked-content reference dictionaries.
pub fn mcids_of(elem: &Dictionary) -> Vec<i64> {
    fn collect(obj: &Object, out: &mut Vec<i64>) {
        match obj {
            Object::Integer(mcid) => out.push(*mcid),
            Object::Dictionary(d) => {
                if let Ok(mcid) = d.get(b"MCID").and_then(Object::as_i64) {
                    out.push(mcid);
                }
            }
            Object::Array(items) => items.iter().for_each(|item| collect(item, out)),
            _ => {}
        }
    }
    let mut out = Vec::new();
    if let Ok(k) = elem.get(b"K") {
        collect(k, &mut out);
    }
    out
}

/// Structure element children of an element, in `/K` order.
pub fn child_elems<'a>(doc: &'a Document, elem: &Dictionary) -> Vec<&'a Dictionary> {
    let refs: Vec<ObjectId> = match elem.get(b"K") {
        Ok(Object::Reference(id)) => vec![*id],
        Ok(Object::Array(items)) => items.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => Vec::new(),
    };
    refs.into_iter()
        .filter_map(|id| doc.get_dictionary(id).ok())
        .collect()
}

pub fn tag_of(elem: &Dictionary) -> String {
    String::from_utf8_lossy(elem.get(b"S").unwrap().as_name().unwrap()).into_owned()
}

/// `BDC` markers in a content string as `(tag, mcid)` pairs.
pub fn bdc_markers(content: &str) -> Vec<(String, i64)> {
    let mut markers = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_suffix(">> BDC") {
            let mut parts = rest.split_whitespace();
            let tag = parts.next().unwrap_or("").trim_start_matches('/').to_string();
            let mcid = parts.last().and_then(|n| n.parse().ok()).unwrap_or(-1);
            markers.push((tag, mcid));
        }
    }
    markers
}
