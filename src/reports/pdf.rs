use chrono::Utc;
use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument, PdfLayerReference};

use crate::constants::{CHART_HEIGHT, CHART_WIDTH};
use crate::models::report::status_label;
use crate::models::ReportData;

use super::chart;
use super::ReportsError;

// A4 portrait
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 14.0;
const LINE_MM: f32 = 6.0;
const CHART_DPI: f32 = 96.0;

const CHART_PLACEHOLDER: &str = "Chart could not be generated or no status data.";

/// Assemble the summary PDF for a generated report
///
/// One page: centered title, the aggregate block as text, then a bar
/// chart of the status distribution. A chart that cannot be drawn
/// degrades to a placeholder line; only document assembly is fatal.
pub fn build_summary_pdf(
    report: &ReportData,
    file_id: Option<&str>,
) -> Result<Vec<u8>, ReportsError> {
    let (doc, page, layer) = PdfDocument::new(
        "Analysis Report",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let layer = doc.get_page(page).get_layer(layer);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_err)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_err)?;

    let mut cursor = PAGE_HEIGHT_MM - MARGIN_MM - 6.0;

    let title = match file_id {
        Some(id) => format!("Analysis Report - File ID: {id}"),
        None => "Analysis Report".to_string(),
    };
    let title_x = (PAGE_WIDTH_MM - approx_text_width_mm(&title, 16.0)) / 2.0;
    layer.use_text(&title, 16.0, Mm(title_x), Mm(cursor), &bold);
    cursor -= 2.0 * LINE_MM;

    for line in summary_lines(report, file_id) {
        layer.use_text(line, 9.0, Mm(MARGIN_MM), Mm(cursor), &font);
        cursor -= LINE_MM;
    }
    cursor -= LINE_MM;

    let counts = report
        .analysis
        .as_ref()
        .map(|a| &a.status_counts)
        .filter(|c| !c.is_empty());
    match counts {
        Some(counts) => match chart::render_status_chart(counts, CHART_WIDTH, CHART_HEIGHT) {
            Ok(buffer) => embed_chart(&layer, buffer, cursor)?,
            Err(e) => {
                tracing::warn!("Status chart render failed: {e:#}");
                layer.use_text(CHART_PLACEHOLDER, 9.0, Mm(MARGIN_MM), Mm(cursor), &font);
            }
        },
        None => {
            layer.use_text(CHART_PLACEHOLDER, 9.0, Mm(MARGIN_MM), Mm(cursor), &font);
        }
    }

    doc.save_to_bytes().map_err(pdf_err)
}

/// Text block above the chart
fn summary_lines(report: &ReportData, file_id: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    let analysis = report.analysis.clone().unwrap_or_default();

    let generated_at = analysis
        .generated_at
        .unwrap_or_else(|| Utc::now().to_rfc3339());
    lines.push(format!("Generated at: {generated_at}"));

    let total = analysis.total_records.unwrap_or(report.rows.len() as u64);
    lines.push(format!("Total records analyzed: {total}"));

    if let Some(id) = file_id {
        lines.push(format!("(Previewing details for File ID: {id})"));
    }

    lines.push(String::new());
    if analysis.status_counts.is_empty() {
        lines.push("Status breakdown not available.".to_string());
    } else {
        lines.push("Overall Status Breakdown:".to_string());
        for (status, count) in &analysis.status_counts {
            lines.push(format!("- {}: {}", status_label(status), count));
        }
    }
    lines
}

fn embed_chart(
    layer: &PdfLayerReference,
    buffer: Vec<u8>,
    top_mm: f32,
) -> Result<(), ReportsError> {
    let rgb = RgbImage::from_raw(CHART_WIDTH, CHART_HEIGHT, buffer)
        .ok_or_else(|| ReportsError::Pdf("chart buffer has unexpected size".to_string()))?;
    let image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(rgb));

    let natural_w = px_to_mm(CHART_WIDTH);
    let natural_h = px_to_mm(CHART_HEIGHT);
    let target_w = (PAGE_WIDTH_MM - 2.0 * MARGIN_MM) * 0.9;
    let scale = target_w / natural_w;
    let x = (PAGE_WIDTH_MM - target_w) / 2.0;
    // translate is the image's bottom-left corner
    let y = top_mm - natural_h * scale;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(CHART_DPI),
            ..Default::default()
        },
    );
    Ok(())
}

fn px_to_mm(px: u32) -> f32 {
    px as f32 * 25.4 / CHART_DPI
}

/// Width estimate for builtin Helvetica, close enough for centering
fn approx_text_width_mm(text: &str, font_size_pt: f32) -> f32 {
    text.len() as f32 * font_size_pt * 0.5 * 0.3528
}

fn pdf_err(e: impl std::fmt::Display) -> ReportsError {
    ReportsError::Pdf(e.to_string())
}
