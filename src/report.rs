//! Report snapshots for export, printing and sharing.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ExportError;
use crate::record::{PortionKind, Record};
use crate::totals::{PortionBreakdown, RecordBreakdown, Totals};

pub const DEFAULT_TITLE: &str = "Laporan MBG";
pub const DEFAULT_FILENAME: &str = "laporan_mbg.html";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub name: String,
    pub breakdown: RecordBreakdown,
}

/// Immutable copy of the records and their totals at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub title: String,
    pub bundle_size: u32,
    pub rows: Vec<ReportRow>,
    pub totals: Totals,
}

impl Report {
    pub fn new(title: &str, records: &[Record], bundle_size: u32) -> Self {
        let title = title.trim();
        Self {
            title: if title.is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                title.to_string()
            },
            bundle_size,
            rows: records
                .iter()
                .map(|record| ReportRow {
                    name: record.name.clone(),
                    breakdown: RecordBreakdown::of(record, bundle_size),
                })
                .collect(),
            totals: Totals::compute(records, bundle_size),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Standalone HTML document with one table row per school and a total row.
    pub fn to_html(&self) -> String {
        let title = escape_html(self.title.as_str());
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(html, "<title>{title}</title>");
        html.push_str(concat!(
            "<style>\n",
            "body { font-family: Arial, sans-serif; padding: 20px; }\n",
            "table { width: 100%; border-collapse: collapse; margin: 20px 0; }\n",
            "th, td { border: 1px solid #ddd; padding: 10px; text-align: left; }\n",
            "th { background-color: #f2f2f2; }\n",
            "tfoot td { font-weight: bold; }\n",
            "</style>\n</head>\n<body>\n",
        ));
        let _ = writeln!(html, "<h2>{title}</h2>");
        html.push_str("<table>\n<thead>\n<tr><th>No</th><th>Sekolah</th>");
        for kind in PortionKind::ALL {
            let _ = write!(
                html,
                "<th>{label}</th><th>{label} Ikat</th><th>{label} Ompreng</th>",
                label = kind.label()
            );
        }
        html.push_str("</tr>\n</thead>\n<tbody>\n");
        for (index, row) in self.rows.iter().enumerate() {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td>",
                index + 1,
                escape_html(row.name.as_str())
            );
            for kind in PortionKind::ALL {
                push_html_cells(&mut html, row.breakdown.get(kind));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n<tfoot>\n<tr><td colspan=\"2\">Total</td>");
        for kind in PortionKind::ALL {
            push_html_cells(&mut html, self.totals.get(kind));
        }
        html.push_str("</tr>\n</tfoot>\n</table>\n");
        let _ = writeln!(html, "<p>1 ikat = {} porsi</p>", self.bundle_size);
        html.push_str("</body>\n</html>\n");
        html
    }

    /// Header, one line per school, then a `TOTAL` line.
    pub fn to_csv(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.rows.len() + 2);
        let mut header = vec!["Sekolah".to_string()];
        for kind in PortionKind::ALL {
            header.push(kind.label().to_string());
            header.push(format!("{} Ikat", kind.label()));
            header.push(format!("{} Ompreng", kind.label()));
        }
        lines.push(csv_line(header.as_slice()));
        for row in &self.rows {
            lines.push(csv_line(
                csv_cells(row.name.as_str(), |kind| row.breakdown.get(kind)).as_slice(),
            ));
        }
        lines.push(csv_line(
            csv_cells("TOTAL", |kind| self.totals.get(kind)).as_slice(),
        ));
        lines.join("\n")
    }

    /// Plain text summary for the clipboard or a share sheet.
    pub fn to_share_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "*{}*", self.title);
        for (index, row) in self.rows.iter().enumerate() {
            let _ = writeln!(text, "{}. {}", index + 1, row.name);
            for kind in PortionKind::ALL {
                let _ = writeln!(
                    text,
                    "   {}: {}",
                    kind.label(),
                    describe(row.breakdown.get(kind))
                );
            }
        }
        text.push('\n');
        let _ = writeln!(text, "Total ({} sekolah)", self.totals.records);
        for kind in PortionKind::ALL {
            let _ = writeln!(
                text,
                "   {}: {}",
                kind.label(),
                describe(self.totals.get(kind))
            );
        }
        let _ = write!(text, "1 ikat = {} porsi", self.bundle_size);
        text
    }

    /// Writes [`Report::to_html`] into `dir` and returns the file path.
    /// `filename` is sanitized; an empty one falls back to
    /// [`DEFAULT_FILENAME`].
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Empty`] when there are no rows and
    /// [`ExportError::Io`] when the file cannot be written.
    pub fn export_html(&self, dir: &Path, filename: &str) -> Result<PathBuf, ExportError> {
        if self.is_empty() {
            return Err(ExportError::Empty);
        }
        if let Err(source) = fs::create_dir_all(dir) {
            return Err(ExportError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
        let path = dir.join(sanitize_export_filename(filename));
        fs::write(path.as_path(), self.to_html()).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn describe(breakdown: PortionBreakdown) -> String {
    format!(
        "{} porsi ({} ikat, {} ompreng)",
        breakdown.count, breakdown.bundles, breakdown.remainder
    )
}

fn push_html_cells(html: &mut String, breakdown: PortionBreakdown) {
    let _ = write!(
        html,
        "<td>{}</td><td>{}</td><td>{}</td>",
        breakdown.count, breakdown.bundles, breakdown.remainder
    );
}

fn csv_cells(label: &str, get: impl Fn(PortionKind) -> PortionBreakdown) -> Vec<String> {
    let mut cells = vec![label.to_string()];
    for kind in PortionKind::ALL {
        let breakdown = get(kind);
        cells.push(breakdown.count.to_string());
        cells.push(breakdown.bundles.to_string());
        cells.push(breakdown.remainder.to_string());
    }
    cells
}

fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| csv_escape(cell.as_str()))
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn should_neutralize_csv(value: &str) -> bool {
    let trimmed = value.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('\'') {
        return false;
    }
    matches!(trimmed.chars().next(), Some('=' | '+' | '-' | '@'))
}

fn csv_escape(value: &str) -> String {
    let safe = if should_neutralize_csv(value) {
        format!("'{value}")
    } else {
        value.to_string()
    };
    if safe.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", safe.replace('"', "\"\""))
    } else {
        safe
    }
}

fn sanitize_export_filename(value: &str) -> String {
    let mut out = String::new();
    for ch in value.trim().chars().take(255) {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches(|ch: char| ch == '_' || ch == '.');
    if trimmed.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }
    if trimmed.to_lowercase().ends_with(".html") {
        trimmed.to_string()
    } else {
        format!("{trimmed}.html")
    }
}
