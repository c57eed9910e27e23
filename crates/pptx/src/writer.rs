//! PPTX package assembly.

use crate::slide::{emu, write_slide, MediaStore, REL_SLIDE_LAYOUT};
use crate::templates;
use crate::xml::{relationships, XmlWriter, NS_A, NS_P, NS_R};
use pdf2ppt_core::{Error, PictureFormat, PresentationDocument, PresentationWriter, Result};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Smallest slide edge PowerPoint accepts (1 inch), in EMU.
pub const MIN_SLIDE_EMU: i64 = 914_400;

/// Largest slide edge PowerPoint accepts (56 inches), in EMU.
pub const MAX_SLIDE_EMU: i64 = 51_206_400;

const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_SLIDE_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_SLIDE_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
const CT_PRES_PROPS: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presProps+xml";
const CT_VIEW_PROPS: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml";
const CT_TABLE_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml";
const CT_CORE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_APP: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_APP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_PRES_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps";
const REL_VIEW_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps";
const REL_TABLE_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableStyles";

/// Writes presentations as PowerPoint (.pptx) packages.
#[derive(Debug, Clone, Default)]
pub struct PptxWriter {
    title: Option<String>,
}

impl PptxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Title stored in the document properties.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl PresentationWriter for PptxWriter {
    fn write(&self, presentation: &PresentationDocument) -> Result<Vec<u8>> {
        let mut package = Package::new();

        let mut media = MediaStore::default();
        let mut slides = Vec::with_capacity(presentation.slides.len());
        for slide in &presentation.slides {
            slides.push(write_slide(slide, &mut media)?);
        }
        let slide_count = slides.len();
        let uses = |format: PictureFormat| media.items.iter().any(|(_, p)| p.format == format);

        package.add("[Content_Types].xml", &content_types(slide_count, uses(PictureFormat::Png), uses(PictureFormat::Jpeg))?)?;
        package.add("_rels/.rels", &package_rels()?)?;
        package.add("docProps/core.xml", &core_properties(self.title.as_deref())?)?;
        package.add("docProps/app.xml", &app_properties(slide_count)?)?;

        package.add("ppt/presentation.xml", &presentation_xml(presentation)?)?;
        package.add("ppt/_rels/presentation.xml.rels", &presentation_rels(slide_count)?)?;
        package.add("ppt/presProps.xml", templates::PRES_PROPS.as_bytes())?;
        package.add("ppt/viewProps.xml", templates::VIEW_PROPS.as_bytes())?;
        package.add("ppt/tableStyles.xml", templates::TABLE_STYLES.as_bytes())?;

        package.add("ppt/slideMasters/slideMaster1.xml", templates::SLIDE_MASTER.as_bytes())?;
        package.add(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            &relationships(&[
                ("rId1".to_string(), REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml".to_string()),
                ("rId2".to_string(), REL_THEME, "../theme/theme1.xml".to_string()),
            ])?,
        )?;
        package.add("ppt/slideLayouts/slideLayout1.xml", templates::SLIDE_LAYOUT.as_bytes())?;
        package.add(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            &relationships(&[(
                "rId1".to_string(),
                REL_SLIDE_MASTER,
                "../slideMasters/slideMaster1.xml".to_string(),
            )])?,
        )?;
        package.add("ppt/theme/theme1.xml", templates::THEME.as_bytes())?;

        for (index, slide) in slides.iter().enumerate() {
            let number = index + 1;
            package.add(&format!("ppt/slides/slide{}.xml", number), &slide.xml)?;
            package.add(&format!("ppt/slides/_rels/slide{}.xml.rels", number), &slide.rels)?;
        }
        for (name, picture) in &media.items {
            package.add(&format!("ppt/media/{}", name), &picture.data)?;
        }

        let bytes = package.finish()?;
        log::debug!(
            "Wrote PPTX package: {} slides, {} media files, {} bytes",
            slide_count,
            media.items.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Slide edge in EMU, clamped to what PowerPoint accepts.
pub fn slide_extent_emu(inches: f64) -> i64 {
    emu(inches).clamp(MIN_SLIDE_EMU, MAX_SLIDE_EMU)
}

struct Package {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: FileOptions,
}

impl Package {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    fn add(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.zip
            .start_file(path, self.options)
            .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", path, e)))?;
        self.zip.write_all(data)?;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let cursor = self
            .zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

fn content_types(slide_count: usize, png: bool, jpeg: bool) -> Result<Vec<u8>> {
    let mut xml = XmlWriter::new()?;
    xml.start(
        "Types",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
    )?;
    xml.empty(
        "Default",
        &[("Extension", "rels"), ("ContentType", "application/vnd.openxmlformats-package.relationships+xml")],
    )?;
    xml.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    for (used, format) in [(png, PictureFormat::Png), (jpeg, PictureFormat::Jpeg)] {
        if used {
            xml.empty(
                "Default",
                &[("Extension", format.extension()), ("ContentType", format.content_type())],
            )?;
        }
    }

    let overrides = [
        ("/ppt/presentation.xml", CT_PRESENTATION),
        ("/ppt/presProps.xml", CT_PRES_PROPS),
        ("/ppt/viewProps.xml", CT_VIEW_PROPS),
        ("/ppt/tableStyles.xml", CT_TABLE_STYLES),
        ("/ppt/slideMasters/slideMaster1.xml", CT_SLIDE_MASTER),
        ("/ppt/slideLayouts/slideLayout1.xml", CT_SLIDE_LAYOUT),
        ("/ppt/theme/theme1.xml", CT_THEME),
        ("/docProps/core.xml", CT_CORE),
        ("/docProps/app.xml", CT_APP),
    ];
    for (part, content_type) in overrides {
        xml.empty("Override", &[("PartName", part), ("ContentType", content_type)])?;
    }
    for number in 1..=slide_count {
        let part = format!("/ppt/slides/slide{}.xml", number);
        xml.empty("Override", &[("PartName", part.as_str()), ("ContentType", CT_SLIDE)])?;
    }

    xml.end("Types")?;
    Ok(xml.finish())
}

fn package_rels() -> Result<Vec<u8>> {
    relationships(&[
        ("rId1".to_string(), REL_OFFICE_DOCUMENT, "ppt/presentation.xml".to_string()),
        ("rId2".to_string(), REL_CORE, "docProps/core.xml".to_string()),
        ("rId3".to_string(), REL_APP, "docProps/app.xml".to_string()),
    ])
}

fn core_properties(title: Option<&str>) -> Result<Vec<u8>> {
    let mut xml = XmlWriter::new()?;
    xml.start(
        "cp:coreProperties",
        &[
            ("xmlns:cp", "http://schemas.openxmlformats.org/package/2006/metadata/core-properties"),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    if let Some(title) = title {
        xml.text_element("dc:title", &[], title)?;
    }
    xml.text_element("dc:creator", &[], "pdf2ppt")?;
    xml.end("cp:coreProperties")?;
    Ok(xml.finish())
}

fn app_properties(slide_count: usize) -> Result<Vec<u8>> {
    let mut xml = XmlWriter::new()?;
    xml.start(
        "Properties",
        &[(
            "xmlns",
            "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
        )],
    )?;
    xml.text_element("Application", &[], "pdf2ppt")?;
    xml.text_element("Slides", &[], &slide_count.to_string())?;
    xml.end("Properties")?;
    Ok(xml.finish())
}

fn presentation_xml(presentation: &PresentationDocument) -> Result<Vec<u8>> {
    let cx = slide_extent_emu(presentation.width_in).to_string();
    let cy = slide_extent_emu(presentation.height_in).to_string();

    let mut xml = XmlWriter::new()?;
    xml.start(
        "p:presentation",
        &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P), ("saveSubsetFonts", "1")],
    )?;
    xml.start("p:sldMasterIdLst", &[])?;
    xml.empty("p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
    xml.end("p:sldMasterIdLst")?;

    if !presentation.is_empty() {
        xml.start("p:sldIdLst", &[])?;
        for index in 0..presentation.slide_count() {
            let id = (256 + index).to_string();
            let rel_id = format!("rId{}", index + 2);
            xml.empty("p:sldId", &[("id", id.as_str()), ("r:id", rel_id.as_str())])?;
        }
        xml.end("p:sldIdLst")?;
    }

    xml.empty("p:sldSz", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    xml.empty("p:notesSz", &[("cx", "6858000"), ("cy", "9144000")])?;
    xml.start("p:defaultTextStyle", &[])?;
    xml.start("a:defPPr", &[])?;
    xml.empty("a:defRPr", &[("lang", "en-US")])?;
    xml.end("a:defPPr")?;
    xml.end("p:defaultTextStyle")?;
    xml.end("p:presentation")?;
    Ok(xml.finish())
}

/// rId1 is the master, slides follow from rId2, then the shared parts.
fn presentation_rels(slide_count: usize) -> Result<Vec<u8>> {
    let mut rels = vec![(
        "rId1".to_string(),
        REL_SLIDE_MASTER,
        "slideMasters/slideMaster1.xml".to_string(),
    )];
    for number in 1..=slide_count {
        rels.push((format!("rId{}", number + 1), REL_SLIDE, format!("slides/slide{}.xml", number)));
    }
    for (rel_type, target) in [
        (REL_PRES_PROPS, "presProps.xml"),
        (REL_VIEW_PROPS, "viewProps.xml"),
        (REL_TABLE_STYLES, "tableStyles.xml"),
        (REL_THEME, "theme/theme1.xml"),
    ] {
        rels.push((format!("rId{}", rels.len() + 1), rel_type, target.to_string()));
    }
    relationships(&rels)
}
