//! Slide parts: background, pictures and text boxes as PresentationML.

use crate::xml::{relationships, XmlWriter, NS_A, NS_P, NS_R};
use pdf2ppt_core::{
    Background, Frame, ImageBox, Picture, Result, RgbColor, Shape, Slide, TextBox, TextRunSpec,
};

/// English Metric Units per inch.
pub const EMU_PER_INCH: f64 = 914_400.0;

/// Largest run size DrawingML accepts (`sz` is capped at 400000).
pub const MAX_FONT_SIZE_PT: u32 = 4000;

pub(crate) const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub(crate) const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

pub(crate) fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

/// Pictures embedded in the package, named `image{n}.{ext}` in order.
#[derive(Default)]
pub(crate) struct MediaStore<'a> {
    pub(crate) items: Vec<(String, &'a Picture)>,
}

impl<'a> MediaStore<'a> {
    fn add(&mut self, picture: &'a Picture) -> String {
        let name = format!("image{}.{}", self.items.len() + 1, picture.format.extension());
        self.items.push((name.clone(), picture));
        name
    }
}

/// A slide's XML and its relationships part.
pub(crate) struct SlidePart {
    pub(crate) xml: Vec<u8>,
    pub(crate) rels: Vec<u8>,
}

struct SlideRels<'s, 'a> {
    media: &'s mut MediaStore<'a>,
    rels: Vec<(String, &'static str, String)>,
}

impl<'s, 'a> SlideRels<'s, 'a> {
    fn embed(&mut self, picture: &'a Picture) -> String {
        let name = self.media.add(picture);
        let id = format!("rId{}", self.rels.len() + 1);
        self.rels.push((id.clone(), REL_IMAGE, format!("../media/{}", name)));
        id
    }
}

pub(crate) fn write_slide<'a>(slide: &'a Slide, media: &mut MediaStore<'a>) -> Result<SlidePart> {
    let mut rels = SlideRels {
        media,
        rels: vec![(
            "rId1".to_string(),
            REL_SLIDE_LAYOUT,
            "../slideLayouts/slideLayout1.xml".to_string(),
        )],
    };

    let mut xml = XmlWriter::new()?;
    xml.start("p:sld", &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)])?;
    xml.start("p:cSld", &[])?;

    write_background(&mut xml, &slide.background, &mut rels)?;

    xml.start("p:spTree", &[])?;
    xml.start("p:nvGrpSpPr", &[])?;
    xml.empty("p:cNvPr", &[("id", "1"), ("name", "")])?;
    xml.empty("p:cNvGrpSpPr", &[])?;
    xml.empty("p:nvPr", &[])?;
    xml.end("p:nvGrpSpPr")?;
    xml.start("p:grpSpPr", &[])?;
    write_xfrm(&mut xml, &Frame::new(0.0, 0.0, 0.0, 0.0), true)?;
    xml.end("p:grpSpPr")?;

    // Shape ids 1 belongs to the tree itself.
    for (index, shape) in slide.shapes.iter().enumerate() {
        let id = index + 2;
        match shape {
            Shape::Image(image) => {
                let rel_id = rels.embed(&image.picture);
                write_picture(&mut xml, id, image, &rel_id)?;
            }
            Shape::Text(text) => write_text_box(&mut xml, id, text)?,
        }
    }

    xml.end("p:spTree")?;
    xml.end("p:cSld")?;
    xml.start("p:clrMapOvr", &[])?;
    xml.empty("a:masterClrMapping", &[])?;
    xml.end("p:clrMapOvr")?;
    xml.end("p:sld")?;

    Ok(SlidePart {
        xml: xml.finish(),
        rels: relationships(&rels.rels)?,
    })
}

fn write_background<'a>(
    xml: &mut XmlWriter,
    background: &'a Background,
    rels: &mut SlideRels<'_, 'a>,
) -> Result<()> {
    xml.start("p:bg", &[])?;
    xml.start("p:bgPr", &[])?;
    match background {
        Background::Solid(color) => write_solid_fill(xml, *color)?,
        Background::Raster(picture) => {
            let rel_id = rels.embed(picture);
            xml.start("a:blipFill", &[("dpi", "0"), ("rotWithShape", "1")])?;
            xml.empty("a:blip", &[("r:embed", rel_id.as_str())])?;
            xml.empty("a:srcRect", &[])?;
            write_stretch(xml)?;
            xml.end("a:blipFill")?;
        }
    }
    xml.empty("a:effectLst", &[])?;
    xml.end("p:bgPr")?;
    xml.end("p:bg")
}

fn write_picture(xml: &mut XmlWriter, id: usize, image: &ImageBox, rel_id: &str) -> Result<()> {
    let id = id.to_string();
    let name = format!("Picture {}", id);

    xml.start("p:pic", &[])?;
    xml.start("p:nvPicPr", &[])?;
    xml.empty("p:cNvPr", &[("id", id.as_str()), ("name", name.as_str())])?;
    xml.start("p:cNvPicPr", &[])?;
    xml.empty("a:picLocks", &[("noChangeAspect", "1")])?;
    xml.end("p:cNvPicPr")?;
    xml.empty("p:nvPr", &[])?;
    xml.end("p:nvPicPr")?;

    xml.start("p:blipFill", &[])?;
    xml.empty("a:blip", &[("r:embed", rel_id)])?;
    write_stretch(xml)?;
    xml.end("p:blipFill")?;

    xml.start("p:spPr", &[])?;
    write_xfrm(xml, &image.frame, false)?;
    write_rect_geometry(xml)?;
    xml.end("p:spPr")?;
    xml.end("p:pic")
}

fn write_text_box(xml: &mut XmlWriter, id: usize, text: &TextBox) -> Result<()> {
    let id = id.to_string();
    let name = format!("TextBox {}", id);

    xml.start("p:sp", &[])?;
    xml.start("p:nvSpPr", &[])?;
    xml.empty("p:cNvPr", &[("id", id.as_str()), ("name", name.as_str())])?;
    xml.empty("p:cNvSpPr", &[("txBox", "1")])?;
    xml.empty("p:nvPr", &[])?;
    xml.end("p:nvSpPr")?;

    xml.start("p:spPr", &[])?;
    write_xfrm(xml, &text.frame, false)?;
    write_rect_geometry(xml)?;
    match text.fill {
        Some(color) => write_solid_fill(xml, color)?,
        None => xml.empty("a:noFill", &[])?,
    }
    xml.end("p:spPr")?;

    xml.start("p:txBody", &[])?;
    xml.start(
        "a:bodyPr",
        &[
            ("wrap", "none"),
            ("lIns", "0"),
            ("tIns", "0"),
            ("rIns", "0"),
            ("bIns", "0"),
            ("rtlCol", "0"),
            ("anchor", "t"),
        ],
    )?;
    xml.empty("a:noAutofit", &[])?;
    xml.end("a:bodyPr")?;
    xml.empty("a:lstStyle", &[])?;
    xml.start("a:p", &[])?;
    for run in &text.runs {
        write_run(xml, run)?;
    }
    xml.end("a:p")?;
    xml.end("p:txBody")?;
    xml.end("p:sp")
}

fn write_run(xml: &mut XmlWriter, run: &TextRunSpec) -> Result<()> {
    let size = (run.size_pt.min(MAX_FONT_SIZE_PT) * 100).to_string();
    let flag = |on: bool| if on { "1" } else { "0" };

    xml.start("a:r", &[])?;
    xml.start(
        "a:rPr",
        &[
            ("lang", "en-US"),
            ("sz", size.as_str()),
            ("b", flag(run.bold)),
            ("i", flag(run.italic)),
            ("dirty", "0"),
        ],
    )?;
    write_solid_fill(xml, run.color)?;
    xml.empty("a:latin", &[("typeface", run.font_face.as_str())])?;
    xml.empty("a:cs", &[("typeface", run.font_face.as_str())])?;
    xml.end("a:rPr")?;
    xml.text_element("a:t", &[], &run.text)?;
    xml.end("a:r")
}

fn write_xfrm(xml: &mut XmlWriter, frame: &Frame, group: bool) -> Result<()> {
    let (x, y) = (emu(frame.x).to_string(), emu(frame.y).to_string());
    let (cx, cy) = (emu(frame.width).to_string(), emu(frame.height).to_string());

    xml.start("a:xfrm", &[])?;
    xml.empty("a:off", &[("x", x.as_str()), ("y", y.as_str())])?;
    xml.empty("a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    if group {
        xml.empty("a:chOff", &[("x", x.as_str()), ("y", y.as_str())])?;
        xml.empty("a:chExt", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    }
    xml.end("a:xfrm")
}

fn write_rect_geometry(xml: &mut XmlWriter) -> Result<()> {
    xml.start("a:prstGeom", &[("prst", "rect")])?;
    xml.empty("a:avLst", &[])?;
    xml.end("a:prstGeom")
}

fn write_stretch(xml: &mut XmlWriter) -> Result<()> {
    xml.start("a:stretch", &[])?;
    xml.empty("a:fillRect", &[])?;
    xml.end("a:stretch")
}

fn write_solid_fill(xml: &mut XmlWriter, color: RgbColor) -> Result<()> {
    let hex = color.to_hex();
    xml.start("a:solidFill", &[])?;
    xml.empty("a:srgbClr", &[("val", hex.as_str())])?;
    xml.end("a:solidFill")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf2ppt_core::PictureFormat;

    fn picture(format: PictureFormat) -> Picture {
        Picture {
            data: vec![1, 2, 3],
            format,
            width_px: 10,
            height_px: 10,
        }
    }

    fn run(text: &str) -> TextRunSpec {
        TextRunSpec {
            text: text.to_string(),
            size_pt: 12,
            bold: true,
            italic: false,
            font_face: "Georgia".to_string(),
            color: RgbColor::new(255, 0, 0),
        }
    }

    #[test]
    fn test_emu() {
        assert_eq!(emu(1.0), 914_400);
        assert_eq!(emu(10.0 / 72.0), 127_000);
    }

    #[test]
    fn test_slide_xml_and_rels() {
        let slide = Slide {
            background: Background::Raster(picture(PictureFormat::Jpeg)),
            shapes: vec![
                Shape::Image(ImageBox {
                    frame: Frame::new(1.0, 2.0, 3.0, 4.0),
                    picture: picture(PictureFormat::Png),
                }),
                Shape::Text(TextBox {
                    frame: Frame::new(0.5, 0.5, 2.0, 0.25),
                    runs: vec![run("Fish & Chips")],
                    fill: None,
                }),
            ],
        };

        let mut media = MediaStore::default();
        let part = write_slide(&slide, &mut media).unwrap();
        let xml = String::from_utf8(part.xml).unwrap();
        let rels = String::from_utf8(part.rels).unwrap();

        let names: Vec<&str> = media.items.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["image1.jpeg", "image2.png"]);

        assert!(xml.contains(r#"<a:blip r:embed="rId2"/><a:srcRect/>"#));
        assert!(xml.contains(r#"<p:cNvPr id="2" name="Picture 2"/>"#));
        assert!(xml.contains(r#"<a:blip r:embed="rId3"/>"#));
        assert!(xml.contains(r#"<a:off x="914400" y="1828800"/><a:ext cx="2743200" cy="3657600"/>"#));
        assert!(xml.contains(r#"<p:cNvSpPr txBox="1"/>"#));
        assert!(xml.contains("<a:noFill/>"));
        assert!(xml.contains(r#"wrap="none" lIns="0" tIns="0" rIns="0" bIns="0""#));
        assert!(xml.contains(r#"sz="1200" b="1" i="0""#));
        assert!(xml.contains(r#"<a:srgbClr val="FF0000"/>"#));
        assert!(xml.contains(r#"<a:latin typeface="Georgia"/><a:cs typeface="Georgia"/>"#));
        assert!(xml.contains("<a:t>Fish &amp; Chips</a:t>"));

        assert!(rels.contains(r#"Target="../slideLayouts/slideLayout1.xml""#));
        assert!(rels.contains(r#"Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.jpeg""#));
        assert!(rels.contains(r#"Target="../media/image2.png""#));
    }

    #[test]
    fn test_solid_background_and_filled_box() {
        let slide = Slide {
            background: Background::Solid(RgbColor::new(0x12, 0x34, 0x56)),
            shapes: vec![Shape::Text(TextBox {
                frame: Frame::new(0.0, 0.0, 1.0, 1.0),
                runs: vec![run("x")],
                fill: Some(RgbColor::WHITE),
            })],
        };
        let mut media = MediaStore::default();
        let part = write_slide(&slide, &mut media).unwrap();
        let xml = String::from_utf8(part.xml).unwrap();

        assert!(media.items.is_empty());
        assert!(xml.contains(r#"<p:bgPr><a:solidFill><a:srgbClr val="123456"/></a:solidFill><a:effectLst/></p:bgPr>"#));
        assert!(xml.contains(r#"</a:prstGeom><a:solidFill><a:srgbClr val="FFFFFF"/></a:solidFill></p:spPr>"#));
        assert!(!xml.contains("<a:noFill/>"));
    }

    #[test]
    fn test_run_size_is_capped() {
        let mut huge = run("big");
        huge.size_pt = 9000;
        let slide = Slide {
            background: Background::Solid(RgbColor::WHITE),
            shapes: vec![Shape::Text(TextBox {
                frame: Frame::new(0.0, 0.0, 1.0, 1.0),
                runs: vec![huge, run("normal")],
                fill: None,
            })],
        };
        let part = write_slide(&slide, &mut MediaStore::default()).unwrap();
        let xml = String::from_utf8(part.xml).unwrap();

        assert!(xml.contains(r#"sz="400000""#));
        assert!(xml.contains(r#"sz="1200""#));
        assert!(!xml.contains(r#"sz="900000""#));
    }
}
