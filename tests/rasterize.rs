//! Integration tests for the rasterisation core against a real pdfium.
//!
//! Most fixtures are generated in-process; `fixtures/encrypted.pdf` is an
//! RC4-40 document with user password `secret`. The tests need a pdfium
//! library; when none can be located they print SKIP and pass. Set
//! `RUST_LOG=pdf2md_mcp=debug` to see the library's logs.
//!
//! Run with:
//!   PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test rasterize -- --nocapture
//!
//! or fetch a copy once with `pdf2md-mcp setup`.

use pdf2md_mcp::pipeline::encode::PNG_SIGNATURE;
use pdf2md_mcp::{inspect, rasterize_page, render_page_png, RasterConfig, RasterError, ToolError};
use std::io::Write;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

const ENCRYPTED_PDF: &[u8] = include_bytes!("fixtures/encrypted.pdf");

static TRACING: Once = Once::new();

/// Route library logs through the test harness's captured output.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Skip this test if pdfium cannot be located and bound.
macro_rules! pdfium_or_skip {
    () => {{
        init_tracing();
        if let Err(e) = pdf2md_mcp::backend::init(None) {
            println!("SKIP — {e}");
            return;
        }
    }};
}

/// A US Letter PDF with `pages` pages. Each page shows "Page N" in Helvetica
/// near the top and a filled black 100×100 pt square at (200, 300).
fn letter_pdf(pages: usize) -> Vec<u8> {
    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".into(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..pages)
                .map(|i| format!("{} 0 R", 4 + 2 * i))
                .collect::<Vec<_>>()
                .join(" "),
            pages
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".into(),
    ];
    for i in 0..pages {
        let content = format!(
            "BT /F1 24 Tf 72 720 Td (Page {}) Tj ET\n0 0 0 rg 200 300 100 100 re f\n",
            i + 1
        );
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(
        format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes(),
    );
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

fn decode(png: &[u8]) -> image::RgbaImage {
    image::load_from_memory(png)
        .expect("output decodes as an image")
        .to_rgba8()
}

// ── Scenario: 3-page document ────────────────────────────────────────────────

#[tokio::test]
async fn first_page_renders_to_png() {
    pdfium_or_skip!();
    let png = rasterize_page(letter_pdf(3), 1, &RasterConfig::default())
        .await
        .expect("page 1 renders");

    assert_eq!(png.as_bytes()[..8], PNG_SIGNATURE);
    assert!(png.len() > 1000, "suspiciously small PNG: {} bytes", png.len());
}

#[tokio::test]
async fn page_past_the_end_reports_page_count() {
    pdfium_or_skip!();
    let config = RasterConfig::default();

    assert!(rasterize_page(letter_pdf(3), 3, &config).await.is_ok());

    let err = rasterize_page(letter_pdf(3), 4, &config).await.unwrap_err();
    assert!(
        matches!(err, ToolError::Raster(RasterError::PageOutOfRange { page: 4, total: 3 })),
        "got {err:?}"
    );
    assert!(err.to_string().contains("PDF has 3 pages"), "got: {err}");
}

#[tokio::test]
async fn page_zero_is_invalid() {
    pdfium_or_skip!();
    let err = rasterize_page(letter_pdf(3), 0, &RasterConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Raster(RasterError::InvalidArgument(_))));
}

// ── Pixels ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn output_matches_viewport_and_has_white_background() {
    pdfium_or_skip!();
    let png = rasterize_page(letter_pdf(1), 1, &RasterConfig::default())
        .await
        .unwrap();
    let img = decode(png.as_bytes());

    // 612 × 792 pt at scale 2
    assert_eq!(img.dimensions(), (1224, 1584));
    for (x, y) in [(2, 2), (1220, 1580), (1000, 300)] {
        assert_eq!(
            *img.get_pixel(x, y),
            image::Rgba([255, 255, 255, 255]),
            "blank pixel ({x}, {y}) is not opaque white"
        );
    }
}

#[tokio::test]
async fn content_lands_where_the_page_draws_it() {
    pdfium_or_skip!();
    let png = rasterize_page(letter_pdf(1), 1, &RasterConfig::default())
        .await
        .unwrap();
    let img = decode(png.as_bytes());

    // Centre of the square: (250, 350) pt → (500, 2 × (792 − 350)) px
    let px = img.get_pixel(500, 884);
    assert!(px[0] < 32 && px[1] < 32 && px[2] < 32, "expected black, got {px:?}");
}

#[tokio::test]
async fn scale_one_halves_each_edge() {
    pdfium_or_skip!();
    let config = RasterConfig::builder().scale(1.0).build().unwrap();
    let png = rasterize_page(letter_pdf(1), 1, &config).await.unwrap();
    assert_eq!(decode(png.as_bytes()).dimensions(), (612, 792));
}

#[tokio::test]
async fn repeated_renders_are_identical() {
    pdfium_or_skip!();
    let config = RasterConfig::default();
    let a = rasterize_page(letter_pdf(2), 2, &config).await.unwrap();
    let b = rasterize_page(letter_pdf(2), 2, &config).await.unwrap();
    assert_eq!(decode(a.as_bytes()), decode(b.as_bytes()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_are_independent() {
    pdfium_or_skip!();
    let config = RasterConfig::builder().scale(0.5).build().unwrap();

    let (a, b, c, d) = tokio::join!(
        rasterize_page(letter_pdf(3), 1, &config),
        rasterize_page(letter_pdf(3), 2, &config),
        rasterize_page(letter_pdf(3), 3, &config),
        rasterize_page(letter_pdf(3), 1, &config),
    );
    let (a, b, c, d) = (a.unwrap(), b.unwrap(), c.unwrap(), d.unwrap());
    assert_eq!(decode(a.as_bytes()), decode(d.as_bytes()));
    assert!(!b.is_empty() && !c.is_empty());
}

#[tokio::test]
async fn surface_limit_is_enforced() {
    pdfium_or_skip!();
    let config = RasterConfig::builder()
        .max_surface_pixels(1_000_000)
        .build()
        .unwrap();
    let err = rasterize_page(letter_pdf(1), 1, &config).await.unwrap_err();
    assert!(matches!(err, ToolError::Raster(RasterError::Render { page: 1, .. })));
}

// ── Corrupt input ────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_bytes_are_a_parse_error() {
    pdfium_or_skip!();
    let err = rasterize_page(
        b"Quarterly report\nRevenue: 12\n".to_vec(),
        1,
        &RasterConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ToolError::Raster(RasterError::Parse(_))), "got {err:?}");
}

#[tokio::test]
async fn document_without_pages_is_a_parse_error() {
    pdfium_or_skip!();
    let err = rasterize_page(letter_pdf(0), 1, &RasterConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Raster(RasterError::Parse(_))), "got {err:?}");
}

#[tokio::test]
async fn encrypted_document_without_password_is_a_parse_error() {
    pdfium_or_skip!();
    let err = rasterize_page(ENCRYPTED_PDF.to_vec(), 1, &RasterConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Raster(RasterError::Parse(_))), "got {err:?}");
    assert!(err.to_string().contains("encrypted"), "got: {err}");
}

#[tokio::test]
async fn encrypted_document_with_wrong_password_is_a_parse_error() {
    pdfium_or_skip!();
    let config = RasterConfig::builder().password("hunter2").build().unwrap();
    let err = rasterize_page(ENCRYPTED_PDF.to_vec(), 1, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Raster(RasterError::Parse(_))), "got {err:?}");
    assert!(err.to_string().contains("wrong password"), "got: {err}");
}

#[tokio::test]
async fn encrypted_document_with_password_renders() {
    pdfium_or_skip!();
    let config = RasterConfig::builder()
        .scale(1.0)
        .password("secret")
        .build()
        .unwrap();
    let png = rasterize_page(ENCRYPTED_PDF.to_vec(), 1, &config)
        .await
        .expect("correct password opens the document");
    let img = decode(png.as_bytes());

    assert_eq!(img.dimensions(), (612, 792));
    // Square at (200, 300) pt, 100 pt wide: centre (250, 792 − 350) px
    let px = img.get_pixel(250, 442);
    assert!(px[0] < 32, "expected black, got {px:?}");
}

// ── File entry points ────────────────────────────────────────────────────────

#[tokio::test]
async fn render_and_inspect_from_disk() {
    pdfium_or_skip!();
    let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    file.write_all(&letter_pdf(3)).unwrap();

    let info = inspect(file.path(), &RasterConfig::default()).await.unwrap();
    assert_eq!(info.page_count, 3);
    assert_eq!(info.pages.len(), 3);
    assert_eq!(info.pages[0].viewport.width_px, 1224);

    let png = render_page_png(file.path(), 2, &RasterConfig::default())
        .await
        .unwrap();
    assert_eq!(png.as_bytes()[..8], PNG_SIGNATURE);
}
