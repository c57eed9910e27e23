//! A thin element writer over `quick_xml::Writer`.

use pdf2ppt_core::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

pub(crate) const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub(crate) const NS_PACKAGE_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub(crate) struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Start a document with the standalone XML declaration.
    pub(crate) fn new() -> Result<Self> {
        let mut xml = Self {
            writer: Writer::new(Vec::new()),
        };
        xml.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(xml)
    }

    pub(crate) fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Start(element(name, attrs)))
    }

    pub(crate) fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Empty(element(name, attrs)))
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    /// `<name>text</name>` with the text escaped.
    pub(crate) fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::XmlError(e.to_string()))
    }
}

fn element<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut elem = BytesStart::new(name);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    elem
}

/// `<Relationships>` part listing `(id, type, target)` entries.
pub(crate) fn relationships(rels: &[(String, &str, String)]) -> Result<Vec<u8>> {
    let mut xml = XmlWriter::new()?;
    xml.start("Relationships", &[("xmlns", NS_PACKAGE_RELS)])?;
    for (id, rel_type, target) in rels {
        xml.empty(
            "Relationship",
            &[("Id", id.as_str()), ("Type", rel_type), ("Target", target.as_str())],
        )?;
    }
    xml.end("Relationships")?;
    Ok(xml.finish())
}
