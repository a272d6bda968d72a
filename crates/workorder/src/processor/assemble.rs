use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::GenericImageView;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::config::schema::AssemblyStrategy;
use crate::error::ProcessError;
use crate::processor::RecognizedPage;

const LETTER_WIDTH: i64 = 612;
const LETTER_HEIGHT: i64 = 792;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

/// Objects that are rebuilt for the merged document instead of copied.
const PAGE_TREE_TYPES: [&[u8]; 4] = [b"Catalog", b"Pages", b"Page", b"Outlines"];

/// Builds the final document for `pages` at `output` and returns its page
/// count.
///
/// Per-page fragments are deleted afterwards whatever the outcome. On
/// failure no partial file is left at `output`.
pub fn assemble(
    strategy: AssemblyStrategy,
    pages: &[RecognizedPage],
    output: &Path,
) -> Result<usize, ProcessError> {
    let _span = tracing::info_span!(
        "processor.assemble",
        strategy = strategy.as_str(),
        pages = pages.len()
    )
    .entered();

    let result = if pages.is_empty() {
        Err(assembly_error(output, "no pages to assemble"))
    } else {
        match strategy {
            AssemblyStrategy::FullFidelity => pages
                .iter()
                .map(|page| {
                    page.fragment.clone().ok_or_else(|| {
                        assembly_error(
                            output,
                            format!("page {} has no searchable PDF", page.index + 1),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .and_then(|fragments| merge_pdfs(&fragments, output)),
            AssemblyStrategy::TextOnly => {
                let texts: Vec<&str> = pages
                    .iter()
                    .map(|page| page.text.as_deref().unwrap_or(""))
                    .collect();
                write_text_pdf(&texts, output).map(|()| texts.len())
            }
        }
    };

    for fragment in pages.iter().filter_map(|page| page.fragment.as_ref()) {
        if let Err(e) = std::fs::remove_file(fragment) {
            log::debug!("Could not remove fragment {}: {}", fragment.display(), e);
        }
    }

    match &result {
        Ok(count) => log::debug!("Assembled {} pages into {}", count, output.display()),
        Err(_) => {
            let _ = std::fs::remove_file(output);
        }
    }

    result
}

/// Concatenates single- or multi-page PDFs in the given order.
pub fn merge_pdfs(fragments: &[PathBuf], output: &Path) -> Result<usize, ProcessError> {
    if fragments.is_empty() {
        return Err(assembly_error(output, "no fragments to merge"));
    }

    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for fragment in fragments {
        let mut doc = Document::load(fragment).map_err(|e| {
            assembly_error(output, format!("cannot read {}: {}", fragment.display(), e))
        })?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let fragment_pages = doc.get_pages();
        if fragment_pages.is_empty() {
            return Err(assembly_error(
                output,
                format!("{} contains no pages", fragment.display()),
            ));
        }

        for page_id in fragment_pages.into_values() {
            let mut page = doc
                .get_dictionary(page_id)
                .map_err(|e| {
                    assembly_error(output, format!("bad page in {}: {}", fragment.display(), e))
                })?
                .clone();
            inherit_attributes(&doc, &mut page);
            pages.push((page_id, page));
        }

        for (id, object) in doc.objects {
            let is_tree_node = object
                .type_name()
                .map(|name| PAGE_TREE_TYPES.contains(&name))
                .unwrap_or(false);
            if !is_tree_node {
                objects.insert(id, object);
            }
        }
    }

    let pages_id = (max_id, 0);
    let catalog_id = (max_id + 1, 0);

    let mut merged = Document::with_version("1.5");
    merged.objects = objects;

    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let page_count = kids.len();

    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        merged.objects.insert(id, Object::Dictionary(page));
    }

    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    merged.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );
    merged.trailer.set("Root", catalog_id);
    merged.max_id = catalog_id.0;

    merged.compress();
    merged
        .save(output)
        .map_err(|e| assembly_error(output, format!("cannot write merged PDF: {}", e)))?;

    Ok(page_count)
}

fn inherit_attributes(doc: &Document, page: &mut Dictionary) {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        // guards against cyclic page trees
        if depth > 32 {
            break;
        }
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }
}

/// Writes one US-Letter page per entry, each holding that text in Courier.
pub fn write_text_pdf(pages: &[&str], path: &Path) -> Result<(), ProcessError> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Stream::new(dictionary! {}, format_text_for_pdf(text).into_bytes());
        let content_id = doc.add_object(content);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), LETTER_WIDTH.into(), LETTER_HEIGHT.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.compress();
    doc.save(path)
        .map_err(|e| assembly_error(path, format!("cannot write text PDF: {}", e)))?;

    Ok(())
}

/// One positioned text object per line. Long pages shrink the leading
/// rather than spill onto a second page.
fn format_text_for_pdf(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let usable_height = (LETTER_HEIGHT - 100) as f64;
    let leading = if lines.is_empty() {
        12.0
    } else {
        (usable_height / lines.len() as f64).min(12.0)
    };
    let font_size = (leading * 10.0 / 12.0).max(1.0);

    let mut content = String::new();
    for (i, line) in lines.iter().enumerate() {
        let escaped = escape_pdf_string(line);
        if escaped.trim().is_empty() {
            continue;
        }
        let y = (LETTER_HEIGHT - 50) as f64 - leading * i as f64;
        content.push_str(&format!(
            "BT\n/F1 {:.2} Tf\n50 {:.2} Td\n({}) Tj\nET\n",
            font_size, y, escaped
        ));
    }
    content
}

fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            c if c.is_ascii() && !c.is_control() => c.to_string(),
            _ => " ".to_string(),
        })
        .collect()
}

/// Wraps a page image into a single-page PDF with no text layer, sized so
/// the image prints at `dpi`.
pub fn image_page_pdf(image_path: &Path, dpi: u32, output: &Path) -> Result<(), ProcessError> {
    let img = image::open(image_path).map_err(|e| {
        ProcessError::ImageProcessing(format!(
            "Failed to load image {}: {}",
            image_path.display(),
            e
        ))
    })?;

    let (width, height) = img.dimensions();
    let dpi = dpi.max(1) as f64;
    let page_width = (width as f64 * 72.0 / dpi).round().max(1.0) as i64;
    let page_height = (height as f64 * 72.0 / dpi).round().max(1.0) as i64;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        img.to_rgb8().into_raw(),
    ));
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! {
            "Im1" => image_id,
        },
    });

    let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im1 Do\nQ\n", page_width, page_height);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), page_width.into(), page_height.into()],
        "Resources" => resources_id,
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.compress();
    doc.save(output)
        .map_err(|e| ProcessError::PdfProcessing(e.to_string()))?;

    Ok(())
}

fn assembly_error(path: &Path, reason: impl Into<String>) -> ProcessError {
    ProcessError::Assembly {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
