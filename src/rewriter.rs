use std::io::Write;
use std::ops::Range;
use tracing::debug;

use crate::error::{Result, TaggingError};
use crate::lexer::is_regular;
use crate::logging::PDF_OPERATIONS;

fn check_tag(tag: &str) -> Result<()> {
    if tag.is_empty() || !tag.bytes().all(is_regular) || !tag.is_ascii() {
        return Err(TaggingError::Rewrite(format!("invalid tag name {tag:?}")));
    }
    Ok(())
}

fn begin_marked_content(tag: &str, mcid: i64) -> Result<Vec<u8>> {
    check_tag(tag)?;
    if mcid < 0 {
        return Err(TaggingError::Rewrite(format!("negative MCID {mcid}")));
    }
    let mut out = Vec::new();
    writeln!(out, "/{tag} <</MCID {mcid}>> BDC")?;
    Ok(out)
}

/// Surround `span` with a `BDC … EMC` pair carrying `mcid`. Bytes outside
/// the span are copied unchanged.
pub fn wrap_span(content: &[u8], span: Range<usize>, tag: &str, mcid: i64) -> Result<Vec<u8>> {
    if span.start > span.end || span.end > content.len() {
        return Err(TaggingError::Rewrite(format!(
            "span {span:?} outside stream of {} bytes",
            content.len()
        )));
    }
    let prefix = begin_marked_content(tag, mcid)?;

    let mut out = Vec::with_capacity(content.len() + prefix.len() + 4);
    out.extend_from_slice(&content[..span.start]);
    out.extend_from_slice(&prefix);
    out.extend_from_slice(&content[span.clone()]);
    out.extend_from_slice(b"\nEMC");
    out.extend_from_slice(&content[span.end..]);

    debug!(target: PDF_OPERATIONS, tag, mcid, ?span, "wrapped span in marked content");
    Ok(out)
}

/// A marked-content sequence holding an empty text object, for elements that
/// could not be located on the page.
pub fn placeholder_sequence(tag: &str, mcid: i64) -> Result<Vec<u8>> {
    let mut out = b"\n".to_vec();
    out.extend(begin_marked_content(tag, mcid)?);
    out.extend_from_slice(b"BT 0 0 Td ET\nEMC\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    #[test]
    fn wraps_span_and_keeps_surrounding_bytes() {
        let content = b"q 1 0 0 1 0 0 cm Q\nBT (Hi) Tj ET\n0 0 m";
        let start = 19;
        let end = start + b"BT (Hi) Tj ET".len();
        let out = wrap_span(content, start..end, "H1", 0).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "q 1 0 0 1 0 0 cm Q\n/H1 <</MCID 0>> BDC\nBT (Hi) Tj ET\nEMC\n0 0 m"
        );
    }

    #[test]
    fn wrapped_stream_still_tokenizes() {
        let content = b"BT (a) Tj ET";
        let out = wrap_span(content, 0..content.len(), "Figure", 3).unwrap();
        let operators: Vec<String> = tokenize(&out)
            .unwrap()
            .into_iter()
            .map(|op| op.operator)
            .collect();
        assert_eq!(operators, vec!["BDC", "BT", "Tj", "ET", "EMC"]);
    }

    #[test]
    fn rejects_bad_spans_and_tags() {
        assert!(wrap_span(b"BT ET", 2..10, "P", 0).is_err());
        assert!(wrap_span(b"BT ET", 0..5, "H 1", 0).is_err());
        assert!(wrap_span(b"BT ET", 0..5, "", 0).is_err());
        assert!(wrap_span(b"BT ET", 0..5, "P", -1).is_err());
    }

    #[test]
    fn placeholder_is_balanced_marked_content() {
        let out = placeholder_sequence("H2", 4).unwrap();
        assert_eq!(
            String::from_utf8(out.clone()).unwrap(),
            "\n/H2 <</MCID 4>> BDC\nBT 0 0 Td ET\nEMC\n"
        );
        let ops = tokenize(&out).unwrap();
        assert_eq!(ops.first().map(|op| op.operator.as_str()), Some("BDC"));
        assert_eq!(ops.last().map(|op| op.operator.as_str()), Some("EMC"));
    }
}
