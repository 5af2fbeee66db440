use serde::Serialize;

/// Outcome of a tagging run, printed as JSON on stdout.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagReport {
    pub success: bool,
    /// Empty until the run succeeds.
    pub output_path: String,
    pub tags_applied: u32,
    pub changes: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl TagReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the run successful with the document written to `path`.
    pub fn succeed(&mut self, path: &std::path::Path) {
        self.success = true;
        self.output_path = path.display().to_string();
    }

    pub fn change(&mut self, entry: String) {
        self.changes.push(entry);
    }

    /// Record a change for a structure element that was added.
    pub fn tagged(&mut self, entry: String) {
        self.tags_applied += 1;
        self.changes.push(entry);
    }

    pub fn warn(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Record a fatal error. The run is unsuccessful from here on.
    pub fn fail(&mut self, error: String) {
        self.success = false;
        self.errors.push(error);
    }

    pub fn to_json(&self, pretty: bool) -> String {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.unwrap_or_else(|e| {
            format!(r#"{{"success": false, "errors": ["failed to serialize report: {e}"]}}"#)
        })
    }
}

/// Suffix for change entries.
pub fn linked_indicator(linked: bool) -> &'static str {
    if linked {
        "(content-linked)"
    } else {
        "(struct-only)"
    }
}

/// Shorten `text` to at most `max_chars` characters, marking the cut with
/// `...`.
pub fn summarize(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
