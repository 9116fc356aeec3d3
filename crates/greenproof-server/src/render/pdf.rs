//! Two-page A4 PDF rendering of an [`AuditReport`].
//!
//! Page 1 carries the summary lines and the satellite badge. Page 2 is the
//! evidence grid: four 90 mm quadrants, each captioned above the image.

use std::io::BufWriter;
use std::path::Path;

use printpdf::image_crate as pdf_image;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfLayerReference, Rgb,
};

use greenproof::report::{GridSlot, EVIDENCE_TITLE, REPORT_TITLE};
use greenproof::{AuditError, AuditReport, AuditResult, ReportRenderer};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;

/// Edge of the square box each evidence image is fitted into.
const EVIDENCE_BOX_MM: f32 = 90.0;

const BADGE_TEXT: &str = "Satellite Data: Verified";

/// Renders reports as PDF bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReportRenderer;

impl ReportRenderer for PdfReportRenderer {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, report: &AuditReport) -> AuditResult<Vec<u8>> {
        let (doc, page1, layer1) =
            PdfDocument::new(REPORT_TITLE, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Summary");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_err)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(render_err)?;

        let summary = doc.get_page(page1).get_layer(layer1);
        draw_summary(&summary, report, &regular, &bold);

        let (page2, layer2) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Evidence");
        let evidence = doc.get_page(page2).get_layer(layer2);
        draw_evidence(&evidence, report, &regular);

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf).map_err(render_err)?;
        buf.into_inner().map_err(|e| AuditError::Render(format!("PDF buffer error: {e}")))
    }
}

fn draw_summary(layer: &PdfLayerReference, report: &AuditReport, regular: &IndirectFontRef, bold: &IndirectFontRef) {
    let mut y = PAGE_HEIGHT_MM - 20.0;
    layer.use_text(REPORT_TITLE, 16.0, Mm(MARGIN_MM), Mm(y), bold);
    y -= 12.0;

    let lines = report.summary_lines();
    let (headline, details) = lines.split_at(3.min(lines.len()));
    for line in headline {
        layer.use_text(line.as_str(), 12.0, Mm(MARGIN_MM), Mm(y), regular);
        y -= 10.0;
    }
    layer.use_text("-".repeat(40), 12.0, Mm(MARGIN_MM), Mm(y), regular);
    y -= 10.0;
    for line in details {
        layer.use_text(line.as_str(), 12.0, Mm(MARGIN_MM), Mm(y), regular);
        y -= 8.0;
    }

    if report.satellite_verified {
        layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.5, 0.0, None)));
        layer.use_text(BADGE_TEXT, 12.0, Mm(MARGIN_MM), Mm(y), bold);
        layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    }
}

fn draw_evidence(layer: &PdfLayerReference, report: &AuditReport, font: &IndirectFontRef) {
    layer.use_text(EVIDENCE_TITLE, 14.0, Mm(MARGIN_MM), Mm(PAGE_HEIGHT_MM - 15.0), font);

    for item in &report.evidence {
        let (left, top) = slot_origin(item.placement.slot);
        let Some(image) = load_rgb(&item.path) else {
            continue;
        };
        layer.use_text(item.caption.as_str(), 10.0, Mm(left), Mm(PAGE_HEIGHT_MM - (top - 5.0)), font);
        place_image(layer, &image, left, top);
    }
}

/// Top-left corner of a grid quadrant, in millimetres from the page's top-left.
fn slot_origin(slot: GridSlot) -> (f32, f32) {
    match slot {
        GridSlot::TopLeft => (10.0, 30.0),
        GridSlot::TopRight => (110.0, 30.0),
        GridSlot::BottomLeft => (10.0, 130.0),
        GridSlot::BottomRight => (110.0, 130.0),
    }
}

/// Size in millimetres of an image fitted into the evidence box.
fn fitted_size_mm(width_px: u32, height_px: u32) -> (f32, f32) {
    let (w, h) = (width_px.max(1) as f32, height_px.max(1) as f32);
    let scale = EVIDENCE_BOX_MM / w.max(h);
    (w * scale, h * scale)
}

fn place_image(layer: &PdfLayerReference, img: &pdf_image::RgbImage, left: f32, top: f32) {
    let (width_mm, height_mm) = fitted_size_mm(img.width(), img.height());
    let dpi = img.width().max(1) as f32 * 25.4 / width_mm;

    let image = Image::from_dynamic_image(&pdf_image::DynamicImage::ImageRgb8(img.clone()));
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(left)),
            translate_y: Some(Mm(PAGE_HEIGHT_MM - top - height_mm)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

/// Decode an evidence file into the PDF backend's pixel type.
fn load_rgb(path: &Path) -> Option<pdf_image::RgbImage> {
    let decoded = match image::open(path) {
        Ok(img) => img.to_rgb8(),
        Err(e) => {
            tracing::warn!("Skipping evidence image {}: {e}", path.display());
            return None;
        }
    };
    let (w, h) = decoded.dimensions();
    pdf_image::RgbImage::from_raw(w, h, decoded.into_raw())
}

fn render_err(e: impl std::fmt::Display) -> AuditError {
    AuditError::Render(format!("PDF error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};
    use greenproof::{
        estimate_credits, score_trust, synthesize_report, AnalysisMetrics, CaptureMetadata,
        CrossCheck, GeoLocation, ReportArtifacts, ReportInputs, ScoringPolicy,
    };

    fn report_with(artifacts: ReportArtifacts, location: GeoLocation, check: CrossCheck) -> AuditReport {
        let metrics = AnalysisMetrics::new(0.95, 30.0, 40.0, 5.0);
        let policy = ScoringPolicy::default();
        synthesize_report(ReportInputs {
            audit_id: "r1".into(),
            project_id: "plot-9".into(),
            generated_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            metadata: CaptureMetadata {
                timestamp: "2024:05:01 10:00:00".into(),
                location,
            },
            trust: score_trust(&metrics, &location, &check, &policy),
            credits: estimate_credits(&metrics, &policy),
            metrics,
            cross_check: check,
            artifacts,
        })
    }

    fn write_jpeg(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(w, h, image::Rgb([40, 160, 40]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_fitted_size() {
        assert_eq!(fitted_size_mm(600, 600), (90.0, 90.0));
        let (w, h) = fitted_size_mm(800, 400);
        assert_eq!(w, 90.0);
        assert!((h - 45.0).abs() < 1e-4);
        let (w, h) = fitted_size_mm(300, 600);
        assert!((w - 45.0).abs() < 1e-4);
        assert_eq!(h, 90.0);
    }

    #[test]
    fn test_renders_pdf_with_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ReportArtifacts {
            baseline: write_jpeg(dir.path(), "b.jpg", 64, 48),
            current: write_jpeg(dir.path(), "c.jpg", 64, 48),
            heatmap: write_jpeg(dir.path(), "h.jpg", 64, 48),
            forgery_residual: write_jpeg(dir.path(), "e.jpg", 64, 48),
            satellite: Some(write_jpeg(dir.path(), "s.png", 60, 60)),
        };
        let report = report_with(
            artifacts,
            GeoLocation::Valid { lat: 10.51, lon: -73.96 },
            CrossCheck::attempted(true),
        );
        assert!(report.satellite_verified);

        let bytes = PdfReportRenderer.render(&report).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_missing_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone.jpg");
        let artifacts = ReportArtifacts {
            baseline: gone.clone(),
            current: gone.clone(),
            heatmap: gone.clone(),
            forgery_residual: gone,
            satellite: None,
        };
        let report = report_with(artifacts, GeoLocation::Invalid, CrossCheck::not_attempted());
        let bytes = PdfReportRenderer.render(&report).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(PdfReportRenderer.content_type(), "application/pdf");
    }
}
