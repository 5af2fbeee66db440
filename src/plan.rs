use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, TaggingError};
use crate::geo::Rect;

/// A tagging plan: which document to tag, where to write it, and the
/// ordered list of semantic elements to apply.
#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub language: Option<String>,
}

impl Plan {
    pub fn from_json(json: &str) -> Result<Plan> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a plan from disk, expanding `~` and environment variables in the
    /// document paths it names.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Plan> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TaggingError::Plan(format!(
                "cannot read plan {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut plan = Plan::from_json(&json)?;
        plan.input_path = expand_path(&plan.input_path)?;
        plan.output_path = expand_path(&plan.output_path)?;
        Ok(plan)
    }
}

pub fn expand_path(path: &Path) -> Result<PathBuf> {
    match path.to_str() {
        Some(raw) => shellexpand::full(raw)
            .map(|expanded| PathBuf::from(expanded.as_ref()))
            .map_err(|e| TaggingError::Plan(e.to_string())),
        None => Ok(path.to_path_buf()),
    }
}

/// One element of the plan. `page` is 0-based; `bbox` uses the producer's
/// top-left origin.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawElement")]
pub struct Element {
    pub page: i64,
    pub bbox: Option<BBox>,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Heading {
        level: i64,
        text: String,
    },
    Image {
        alt_text: String,
        image_id: Option<String>,
        /// Object number of the image XObject, if the producer knew it.
        xref: Option<u32>,
    },
    Table {
        table_id: Option<String>,
        header_rows: usize,
        rows: Vec<TableRow>,
    },
    Link {
        link_id: Option<String>,
        link_text: String,
        link_url: Option<String>,
    },
    Unknown(String),
}

impl ElementKind {
    pub fn type_name(&self) -> &str {
        match self {
            ElementKind::Heading { .. } => "heading",
            ElementKind::Image { .. } => "image_alt",
            ElementKind::Table { .. } => "table",
            ElementKind::Link { .. } => "link",
            ElementKind::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TableRow {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TableCell {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default)]
    pub grid_span: i64,
}

impl TableCell {
    /// Number of grid columns the cell covers, never less than one.
    pub fn span(&self) -> u32 {
        self.grid_span.clamp(1, u32::MAX as i64) as u32
    }
}

/// Bounding box in the plan producer's convention: origin top-left, y grows
/// downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    /// Flip into PDF user space using the page height.
    pub fn to_pdf_rect(&self, page_height: f64) -> Rect {
        Rect::new(self.x0, page_height - self.y1, self.x1, page_height - self.y0)
    }
}

impl TryFrom<Vec<f64>> for BBox {
    type Error = String;

    fn try_from(values: Vec<f64>) -> std::result::Result<Self, Self::Error> {
        let [x0, y0, x1, y1] = <[f64; 4]>::try_from(values.as_slice())
            .map_err(|_| format!("bbox needs 4 numbers, got {}", values.len()))?;
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return Err(format!("bbox {values:?} has non-finite coordinates"));
        }
        if x0 > x1 || y0 > y1 {
            return Err(format!("bbox {values:?} is not ordered as [x0, y0, x1, y1]"));
        }
        Ok(BBox { x0, y0, x1, y1 })
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.1}, {:.1}, {:.1}, {:.1}]",
            self.x0, self.y0, self.x1, self.y1
        )
    }
}

// Wire shape of an element: one flat object whose meaningful fields depend
// on `type`.
#[derive(Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: String,
    page: Option<i64>,
    bbox: Option<Vec<f64>>,
    level: Option<i64>,
    text: Option<String>,
    alt_text: Option<String>,
    image_id: Option<String>,
    xref: Option<i64>,
    table_id: Option<String>,
    header_rows: Option<i64>,
    rows: Option<Vec<TableRow>>,
    link_id: Option<String>,
    link_text: Option<String>,
    link_url: Option<String>,
}

impl TryFrom<RawElement> for Element {
    type Error = String;

    fn try_from(raw: RawElement) -> std::result::Result<Self, Self::Error> {
        let bbox = raw.bbox.map(BBox::try_from).transpose()?;

        let kind = match raw.kind.as_str() {
            "heading" => ElementKind::Heading {
                level: raw.level.unwrap_or(0),
                text: raw.text.unwrap_or_default(),
            },
            "image_alt" => ElementKind::Image {
                alt_text: raw.alt_text.unwrap_or_default(),
                image_id: raw.image_id,
                xref: raw
                    .xref
                    .filter(|x| *x > 0)
                    .and_then(|x| u32::try_from(x).ok()),
            },
            "table" => ElementKind::Table {
                table_id: raw.table_id,
                header_rows: raw.header_rows.unwrap_or(0).max(0) as usize,
                rows: raw.rows.unwrap_or_default(),
            },
            "link" => ElementKind::Link {
                link_id: raw.link_id,
                link_text: raw.link_text.unwrap_or_default(),
                link_url: raw.link_url,
            },
            other => ElementKind::Unknown(other.to_string()),
        };

        Ok(Element {
            page: raw.page.unwrap_or(0),
            bbox,
            kind,
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Partition elements by target page. Pages keep the order in which they
/// first appear in the plan and elements keep their plan order per page.
pub fn group_by_page(elements: &[Element]) -> IndexMap<i64, Vec<&Element>> {
    let mut pages: IndexMap<i64, Vec<&Element>> = IndexMap::new();
    for element in elements {
        pages.entry(element.page).or_default().push(element);
    }
    pages
}
