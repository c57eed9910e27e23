//! A PDF file as a [`DocumentSource`].

use crate::content::{interpret, PageContent};
use crate::objects::{inherited, number, numbers};
use lopdf::{Dictionary, Document, ObjectId};
use pdf2ppt_core::{
    DocumentSource, Error, FontInfo, Matrix, OperatorList, PageSize, Result, TextItem,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

/// A parsed, unencrypted PDF document.
///
/// The converter asks for a page's operators, text and fonts one after the
/// other, so the most recently interpreted page is kept.
pub struct PdfDocument {
    doc: Document,
    pages: Vec<ObjectId>,
    last_page: RefCell<Option<(usize, Rc<PageContent>)>>,
}

impl PdfDocument {
    /// Read and parse a PDF file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Parse a PDF held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).map_err(|e| Error::PdfParseError(e.to_string()))?;
        Self::from_document(doc)
    }

    /// Wrap an already parsed document.
    pub fn from_document(doc: Document) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::EncryptedDocument);
        }

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        log::debug!("Opened PDF {} with {} pages", doc.version, pages.len());

        Ok(Self {
            doc,
            pages,
            last_page: RefCell::new(None),
        })
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| Error::source(index, format!("no page at index {}", index)))
    }

    /// The visible area of a page: its CropBox clipped to the MediaBox, plus
    /// the page's `/Rotate`.
    fn page_box(&self, index: usize) -> Result<PageBox> {
        let page_id = self.page_id(index)?;
        let media = match self.read_box(page_id, b"MediaBox") {
            Some(Ok(media)) => media,
            Some(Err(msg)) => return Err(Error::source(index, format!("MediaBox {}", msg))),
            None => return Err(Error::source(index, "missing or malformed MediaBox")),
        };

        let visible = match self.read_box(page_id, b"CropBox") {
            None => media,
            Some(Ok(crop)) => match crop.intersect(&media) {
                Some(visible) => visible,
                None => {
                    log::warn!("Page {}: CropBox lies outside the MediaBox; using the MediaBox", index + 1);
                    media
                }
            },
            Some(Err(msg)) => {
                log::warn!("Page {}: ignoring CropBox that {}", index + 1, msg);
                media
            }
        };

        let rotate = inherited(&self.doc, page_id, b"Rotate")
            .and_then(number)
            .map(|degrees| (degrees as i64).rem_euclid(360))
            .unwrap_or(0);
        let rotation = match rotate {
            0 | 90 | 180 | 270 => rotate,
            other => {
                log::warn!("Page {}: /Rotate {} is not a multiple of 90; ignored", index + 1, other);
                0
            }
        };

        Ok(PageBox { visible, rotation })
    }

    /// A page rectangle attribute, `None` when absent or not four numbers.
    fn read_box(&self, page_id: ObjectId, key: &[u8]) -> Option<std::result::Result<Bounds, &'static str>> {
        let values = inherited(&self.doc, page_id, key)
            .and_then(|obj| obj.as_array().ok())
            .and_then(|items| numbers(&self.doc, items))?;
        match values.as_slice() {
            [x0, y0, x1, y1] => Some(Bounds::normalized(*x0, *y0, *x1, *y1)),
            _ => Some(Err("does not have four numbers")),
        }
    }

    fn content(&self, index: usize) -> Result<Rc<PageContent>> {
        if let Some((cached, content)) = self.last_page.borrow().as_ref() {
            if *cached == index {
                return Ok(Rc::clone(content));
            }
        }

        let page_id = self.page_id(index)?;
        let base = self.page_box(index)?.base_matrix();
        let bytes = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| Error::source(index, format!("cannot get page content: {}", e)))?;

        let empty = Dictionary::new();
        let resources = inherited(&self.doc, page_id, b"Resources")
            .and_then(|obj| obj.as_dict().ok())
            .unwrap_or(&empty);

        let content = interpret(&self.doc, &bytes, resources, base)
            .map_err(|e| Error::source(index, e.to_string()))?;
        log::debug!(
            "Page {}: {} operators, {} text items, {} fonts",
            index + 1,
            content.operators.len(),
            content.text_items.len(),
            content.fonts.len()
        );

        let content = Rc::new(content);
        *self.last_page.borrow_mut() = Some((index, Rc::clone(&content)));
        Ok(content)
    }
}

/// An axis-aligned rectangle in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    left: f64,
    bottom: f64,
    right: f64,
    top: f64,
}

impl Bounds {
    fn normalized(x0: f64, y0: f64, x1: f64, y1: f64) -> std::result::Result<Self, &'static str> {
        let bounds = Self {
            left: x0.min(x1),
            bottom: y0.min(y1),
            right: x0.max(x1),
            top: y0.max(y1),
        };
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err("is empty");
        }
        Ok(bounds)
    }

    fn intersect(&self, other: &Bounds) -> Option<Bounds> {
        let clipped = Bounds {
            left: self.left.max(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.min(other.right),
            top: self.top.min(other.top),
        };
        (clipped.width() > 0.0 && clipped.height() > 0.0).then_some(clipped)
    }

    fn width(&self) -> f64 {
        self.right - self.left
    }

    fn height(&self) -> f64 {
        self.top - self.bottom
    }
}

/// Page geometry as a viewer displays it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageBox {
    visible: Bounds,

    /// Clockwise display rotation: 0, 90, 180 or 270.
    rotation: i64,
}

impl PageBox {
    /// Displayed width and height in points.
    fn size(&self) -> (f64, f64) {
        let (w, h) = (self.visible.width(), self.visible.height());
        match self.rotation {
            90 | 270 => (h, w),
            _ => (w, h),
        }
    }

    /// Maps user space onto the displayed page with its lower-left corner at (0, 0).
    fn base_matrix(&self) -> Matrix {
        let (w, h) = (self.visible.width(), self.visible.height());
        let rotate = match self.rotation {
            90 => Matrix::new(0.0, -1.0, 1.0, 0.0, 0.0, w),
            180 => Matrix::new(-1.0, 0.0, 0.0, -1.0, w, h),
            270 => Matrix::new(0.0, 1.0, -1.0, 0.0, h, 0.0),
            _ => Matrix::identity(),
        };
        Matrix::translate(-self.visible.left, -self.visible.bottom).concat(&rotate)
    }
}

impl DocumentSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize> {
        let (width, height) = self.page_box(index)?.size();
        Ok(PageSize::new(width, height))
    }

    fn operator_list(&self, index: usize) -> Result<OperatorList> {
        Ok(self.content(index)?.operators.clone())
    }

    fn text_content(&self, index: usize) -> Result<Vec<TextItem>> {
        Ok(self.content(index)?.text_items.clone())
    }

    fn page_fonts(&self, index: usize) -> Result<HashMap<String, FontInfo>> {
        Ok(self.content(index)?.fonts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object, Stream};
    use pdf2ppt_core::{Converter, ConversionOptions, OutputMode};

    fn media_box(values: [i64; 4]) -> Object {
        Object::Array(values.into_iter().map(Object::Integer).collect())
    }

    fn sample_document() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let image_id = doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 1, "Height" => 1 },
            vec![0],
        ));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im1" => image_id },
        });

        let first = doc.add_object(Stream::new(
            dictionary! {},
            b"0 0 1 rg BT /F1 24 Tf 72 700 Td (Hello) Tj ET q 200 0 0 100 72 400 cm /Im1 Do Q".to_vec(),
        ));
        let second = doc.add_object(Stream::new(
            dictionary! {},
            b"BT /F1 12 Tf 150 250 Td (Shifted) Tj ET".to_vec(),
        ));

        let page1 = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => first,
        });
        let page2 = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box([100, 200, 400, 600]),
            "Contents" => second,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page1), Object::Reference(page2)],
                "Count" => 2,
                "Resources" => resources_id,
                "MediaBox" => media_box([0, 0, 612, 792]),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn sample_bytes() -> Vec<u8> {
        let mut doc = sample_document();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pages_and_inherited_media_box() {
        let pdf = PdfDocument::from_bytes(&sample_bytes()).unwrap();
        assert_eq!(pdf.page_count(), 2);
        assert_eq!(pdf.page_size(0).unwrap(), PageSize::new(612.0, 792.0));
        assert_eq!(pdf.page_size(1).unwrap(), PageSize::new(300.0, 400.0));
    }

    #[test]
    fn test_page_content_through_source() {
        let pdf = PdfDocument::from_bytes(&sample_bytes()).unwrap();

        let items = pdf.text_content(0).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Hello");
        assert_eq!(items[0].font_name, "F1");

        let fonts = pdf.page_fonts(0).unwrap();
        assert_eq!(fonts["F1"].name, "Helvetica-Bold");

        let walk = pdf2ppt_core::walk_operators(&pdf.operator_list(0).unwrap());
        assert_eq!(walk.text_colors, vec![pdf2ppt_core::RgbColor::new(0, 0, 255)]);
        assert_eq!(
            walk.image_rects,
            vec![pdf2ppt_core::Rect::new(72.0, 400.0, 200.0, 100.0)]
        );
    }

    #[test]
    fn test_media_box_origin_is_shifted() {
        let pdf = PdfDocument::from_bytes(&sample_bytes()).unwrap();
        let items = pdf.text_content(1).unwrap();
        assert_eq!((items[0].transform.e, items[0].transform.f), (50.0, 50.0));
    }

    fn boxed_page(doc: &mut Document, pages_id: ObjectId, attrs: Dictionary) -> ObjectId {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = doc.add_object(Stream::new(
            dictionary! {},
            b"BT /F1 10 Tf 136 236 Td (x) Tj ET".to_vec(),
        ));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        };
        for (key, value) in attrs.iter() {
            page.set(key.clone(), value.clone());
        }
        doc.add_object(page)
    }

    fn boxed_document() -> PdfDocument {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let cropped = boxed_page(
            &mut doc,
            pages_id,
            dictionary! { "CropBox" => media_box([36, 36, 576, 756]) },
        );
        let rotated = boxed_page(
            &mut doc,
            pages_id,
            dictionary! { "MediaBox" => media_box([0, 0, 400, 300]), "Rotate" => -270 },
        );
        let outside = boxed_page(
            &mut doc,
            pages_id,
            dictionary! { "CropBox" => media_box([700, 800, 900, 1000]), "Rotate" => 45 },
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![cropped, rotated, outside].into_iter().map(Object::Reference).collect::<Vec<_>>(),
                "Count" => 3,
                "MediaBox" => media_box([0, 0, 612, 792]),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        PdfDocument::from_document(doc).unwrap()
    }

    #[test]
    fn test_crop_box_sets_size_and_origin() {
        let pdf = boxed_document();
        assert_eq!(pdf.page_size(0).unwrap(), PageSize::new(540.0, 720.0));
        let items = pdf.text_content(0).unwrap();
        assert_eq!((items[0].transform.e, items[0].transform.f), (100.0, 200.0));
    }

    #[test]
    fn test_rotated_page_swaps_size_and_turns_text() {
        let pdf = boxed_document();
        assert_eq!(pdf.page_size(1).unwrap(), PageSize::new(300.0, 400.0));

        // A quarter turn clockwise: (x, y) lands at (y, width - x).
        let item = &pdf.text_content(1).unwrap()[0];
        assert!((item.transform.e - 236.0).abs() < 1e-9);
        assert!((item.transform.f - 264.0).abs() < 1e-9);
        assert!((item.transform.y_scale() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_crop_box_outside_media_box_falls_back() {
        let pdf = boxed_document();
        assert_eq!(pdf.page_size(2).unwrap(), PageSize::new(612.0, 792.0));
        let items = pdf.text_content(2).unwrap();
        assert_eq!((items[0].transform.e, items[0].transform.f), (136.0, 236.0));
    }

    #[test]
    fn test_converts_into_slides() {
        let pdf = PdfDocument::from_bytes(&sample_bytes()).unwrap();
        let converter = Converter::new(ConversionOptions::default().with_mode(OutputMode::Clean));
        let cancel = pdf2ppt_core::CancellationToken::new();

        let presentation = converter.convert(&pdf, None, &cancel, &mut |_| {}).unwrap();
        assert_eq!(presentation.slide_count(), 2);
        let boxes: Vec<_> = presentation.slides[0].text_boxes().collect();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].runs[0].text, "Hello");
        assert!(boxes[0].runs[0].bold);
    }

    #[test]
    fn test_out_of_range_page() {
        let pdf = PdfDocument::from_bytes(&sample_bytes()).unwrap();
        let err = pdf.page_size(5).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read page 6"));
    }

    #[test]
    fn test_rejects_encrypted_and_garbage() {
        let mut doc = sample_document();
        doc.trailer.set("Encrypt", dictionary! { "Filter" => "Standard" });
        assert!(matches!(
            PdfDocument::from_document(doc),
            Err(Error::EncryptedDocument)
        ));

        assert!(matches!(
            PdfDocument::from_bytes(b"not a pdf"),
            Err(Error::PdfParseError(_))
        ));
    }
}
