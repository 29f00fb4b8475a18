//! Format renderers
//!
//! Turns collected clinical records into the requested output payload.
//! Rendering is pure and deterministic: the same records and request always
//! produce the same bytes (timestamps come from the records, not the clock).

use crate::adapters::source::ClinicalRecord;
use crate::domain::request::{ExportFormat, UnifiedExportRequest};
use crate::domain::{BeingError, Result};
use serde::Serialize;

/// Render records into the requested format
pub fn render(
    format: ExportFormat,
    request: &UnifiedExportRequest,
    records: &[ClinicalRecord],
) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => render_csv(records),
        ExportFormat::Json => render_json(request, records),
        ExportFormat::Summary => Ok(render_summary(request, records).into_bytes()),
        ExportFormat::Pdf => render_pdf(request, records),
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn render_csv(records: &[ClinicalRecord]) -> Result<Vec<u8>> {
    let mut out = String::from("record_id,category,recorded_at,summary\n");
    for record in records {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_escape(&record.id),
            record.category,
            record.recorded_at.to_rfc3339(),
            csv_escape(&record.summary),
        ));
    }
    Ok(out.into_bytes())
}

#[derive(Serialize)]
struct JsonExport<'a> {
    export_id: &'a str,
    user_id: &'a str,
    format: &'a str,
    range_start: String,
    range_end: String,
    record_count: usize,
    records: &'a [ClinicalRecord],
}

fn render_json(request: &UnifiedExportRequest, records: &[ClinicalRecord]) -> Result<Vec<u8>> {
    let export = JsonExport {
        export_id: request.export_id.as_str(),
        user_id: request.user_id.as_str(),
        format: "json",
        range_start: request.date_range.start.to_rfc3339(),
        range_end: request.date_range.end.to_rfc3339(),
        record_count: records.len(),
        records,
    };
    serde_json::to_vec_pretty(&export).map_err(Into::into)
}

fn render_summary(request: &UnifiedExportRequest, records: &[ClinicalRecord]) -> String {
    let mut out = String::new();
    out.push_str("Being Data Export Summary\n");
    out.push_str("=========================\n\n");
    out.push_str(&format!("Export:  {}\n", request.export_id));
    out.push_str(&format!(
        "Range:   {} to {}\n",
        request.date_range.start.format("%Y-%m-%d"),
        request.date_range.end.format("%Y-%m-%d"),
    ));
    out.push_str(&format!("Records: {}\n\n", records.len()));

    for category in &request.categories {
        let count = records.iter().filter(|r| r.category == *category).count();
        out.push_str(&format!("  {category}: {count} records\n"));
    }

    out
}

/// Render a minimal single-page PDF carrying the summary text
///
/// The payload is a self-contained PDF 1.4 document with one page and one
/// text stream. A full layout engine is out of scope for the engine itself;
/// the document structure here is complete and readable by standard viewers.
fn render_pdf(request: &UnifiedExportRequest, records: &[ClinicalRecord]) -> Result<Vec<u8>> {
    let text = render_summary(request, records);
    if text.is_empty() {
        return Err(BeingError::Process("Nothing to render".to_string()));
    }

    // Build the page content stream: one text line per summary line.
    let mut content = String::from("BT\n/F1 11 Tf\n50 780 Td\n14 TL\n");
    for line in text.lines() {
        let escaped = line
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        content.push_str(&format!("({escaped}) Tj\nT*\n"));
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>".to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!("<< /Length {} >>\nstream\n{}endstream", content.len(), content),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_offset = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    pdf.push_str("0000000000 65535 f \n");
    for offset in offsets {
        pdf.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));

    Ok(pdf.into_bytes())
}
