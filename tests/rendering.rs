use std::sync::Arc;
use std::thread;

use radar_report::angles::AngleTable;
use radar_report::export::{ChartExporter, ChartFormat, ExportSettings};
use radar_report::fonts;
use radar_report::sample::{sample_record, SAMPLE_SCORES};
use radar_report::series::{CategoryScore, Series};
use radar_report::{RadarChart, ReportAssembler};
use sha2::{Digest, Sha256};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

fn chart_in(images_dir: &std::path::Path) -> RadarChart {
    RadarChart::with_angle_table(
        ChartExporter::new(ExportSettings::default(), images_dir),
        Arc::new(AngleTable::default()),
    )
}

fn series(scores: &[f64]) -> Series {
    Series::new(
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| CategoryScore::new(format!("K{i}"), format!("Category {i}"), score))
            .collect(),
    )
    .expect("non-empty series")
}

fn svg_text(chart: &RadarChart, series: &Series) -> String {
    let result = chart
        .generate(series, &[ChartFormat::Svg])
        .expect("generate svg");
    let bytes = result
        .get(ChartFormat::Svg)
        .expect("svg payload")
        .decode()
        .expect("decode svg");
    String::from_utf8(bytes).expect("utf-8 svg")
}

#[test]
fn sample_record_gains_a_decodable_svg_chart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let assembler = ReportAssembler::new(chart_in(dir.path()));

    let enriched = assembler
        .assemble(sample_record().expect("sample record"))
        .expect("assemble sample");
    let encoded = enriched["RadarGraphBase64"]
        .as_str()
        .expect("chart field is a string");
    assert!(!encoded.is_empty());

    let series = assembler
        .extract_series(&enriched)
        .expect("series from enriched record");
    assert_eq!(series.scores(), SAMPLE_SCORES.to_vec());
}

#[test]
fn svg_payload_uses_the_fixed_view_window() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svg = svg_text(&chart_in(dir.path()), &series(&SAMPLE_SCORES));

    assert!(svg.starts_with("<?xml"));
    assert!(svg.contains(r#"viewBox="-120 -120 240 240""#));
    assert!(svg.contains(r#"width="576pt""#));
    assert!(svg.contains("0%"));
    assert!(svg.contains("100%"));
}

#[test]
fn repeated_renders_hash_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chart = chart_in(dir.path());
    let input = series(&SAMPLE_SCORES);

    let first = Sha256::digest(svg_text(&chart, &input).as_bytes());
    let second = Sha256::digest(svg_text(&chart, &input).as_bytes());
    assert_eq!(first, second);
}

fn render_png(chart: &RadarChart, series: &Series) -> Option<Vec<u8>> {
    if !fonts::fonts_available() {
        return None;
    }

    let result = chart
        .generate(series, &[ChartFormat::Png])
        .expect("generate png");
    let bytes = result
        .get(ChartFormat::Png)
        .expect("png payload")
        .decode()
        .expect("decode png");
    Some(bytes)
}

#[test]
fn repeated_raster_renders_hash_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chart = chart_in(dir.path());
    let input = series(&SAMPLE_SCORES);

    let Some(first) = render_png(&chart, &input) else {
        return;
    };
    let second = render_png(&chart, &input).expect("fonts stay available");

    assert!(first.starts_with(PNG_MAGIC));
    assert_eq!(Sha256::digest(&first), Sha256::digest(&second));
}

#[test]
fn webp_export_persists_a_file_and_returns_png_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let images = dir.path().join("public/images");
    let chart = chart_in(&images);

    let result = chart
        .generate(&series(&SAMPLE_SCORES), &[ChartFormat::Svg, ChartFormat::Webp])
        .expect("generate webp");
    assert_eq!(result.formats(), vec![ChartFormat::Svg, ChartFormat::Webp]);

    let payload = result.get(ChartFormat::Webp).expect("webp payload");
    assert_eq!(payload.media_type, "image/png");
    assert!(payload.decode().expect("decode png").starts_with(PNG_MAGIC));

    let file = payload.file.as_ref().expect("persisted raster path");
    assert_eq!(file, &images.join("radar_chart.webp"));
    let written = std::fs::read(file).expect("read webp");
    assert_eq!(&written[0..4], b"RIFF");
    assert_eq!(&written[8..12], b"WEBP");
}

#[test]
fn png_export_has_padded_dimensions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = chart_in(dir.path())
        .generate(&series(&[40.0, 60.0, 80.0]), &[ChartFormat::Png])
        .expect("generate png");

    let bytes = result
        .get(ChartFormat::Png)
        .expect("png payload")
        .decode()
        .expect("decode png");
    let image = image::load_from_memory(&bytes).expect("load png");
    // 8in at 150 dpi plus 0.1in of padding on each side
    assert_eq!(image.width(), 1230);
    assert_eq!(image.height(), 1230);
    assert!(!dir.path().join("radar_chart.webp").exists());
}

#[test]
fn concurrent_generations_with_different_sizes_stay_independent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = Arc::new(AngleTable::default());
    let exporter = ChartExporter::new(ExportSettings::default(), dir.path());
    let chart = RadarChart::with_angle_table(exporter, Arc::clone(&table));

    let expected_five = svg_text(&chart, &series(&[10.0, 20.0, 30.0, 40.0, 50.0]));
    let expected_eight = svg_text(&chart, &series(&[80.0; 8]));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let chart = chart.clone();
            thread::spawn(move || {
                if i % 2 == 0 {
                    (5, svg_text(&chart, &series(&[10.0, 20.0, 30.0, 40.0, 50.0])))
                } else {
                    (8, svg_text(&chart, &series(&[80.0; 8])))
                }
            })
        })
        .collect();

    for handle in handles {
        let (n, svg) = handle.join().expect("worker thread");
        match n {
            5 => assert_eq!(svg, expected_five),
            _ => assert_eq!(svg, expected_eight),
        }
    }

    assert_eq!(table.angles(5).expect("angles").len(), 5);
    assert_eq!(table.angles(8).expect("angles").len(), 8);
}
