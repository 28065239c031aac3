//! Shared test fixtures: PDFs built with lopdf and small PNG images.

use std::path::{Path, PathBuf};

use lopdf::dictionary;
use lopdf::{Document, Object, Stream};

/// Build a PDF with one page per entry. `Some(text)` pages carry a Helvetica
/// text layer, `None` pages have no content stream at all (image-like).
pub fn make_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

    for text in pages {
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    "F1" => font_id,
                },
            },
        };
        if let Some(text) = text {
            let content = format!("BT /F1 12 Tf 72 700 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            page.set("Contents", content_id);
        }
        let page_id = doc.add_object(page);
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Write `make_pdf(pages)` to `dir/name` and return the path.
pub fn write_pdf(dir: &Path, name: &str, pages: &[Option<&str>]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, make_pdf(pages)).unwrap();
    path
}

/// Write a small patterned RGB PNG to `path`.
pub fn write_png(path: &Path) {
    let img = image::RgbImage::from_fn(32, 32, |x, y| {
        image::Rgb([(x * 7) as u8, (y * 13) as u8, ((x * y) % 251) as u8])
    });
    img.save(path).unwrap();
}

/// Write an executable shell script standing in for an external tool.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}
