//! Content stream interpretation.
//!
//! One pass over a page's content produces both views the core pipeline
//! needs: the operator list (graphics state, fill colors, text shows and
//! image paints) and the text layer (decoded strings with their rendering
//! matrix and advance width). Form XObjects are expanded inline.

use crate::fonts::PdfFont;
use crate::objects::{get, get_array, get_dict, get_name, number, numbers, stream_bytes};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use pdf2ppt_core::normalize::normalize_glyph_text;
use pdf2ppt_core::{Error, FontInfo, Matrix, OpCode, Operand, OperatorList, Result, RgbColor, TextItem};
use std::collections::HashMap;
use std::rc::Rc;

/// Form XObjects nested deeper than this are not expanded.
pub const MAX_FORM_DEPTH: usize = 12;

/// Everything read from one page's content.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub operators: OperatorList,
    pub text_items: Vec<TextItem>,

    /// Fonts used by the page (including inside forms), by resource name.
    pub fonts: HashMap<String, FontInfo>,
}

/// Interpret a content stream with its resources.
///
/// `base` maps the stream's user space onto page space, e.g. to move the
/// visible area's origin to (0, 0) and apply the page rotation.
pub fn interpret(
    doc: &Document,
    content: &[u8],
    resources: &Dictionary,
    base: Matrix,
) -> Result<PageContent> {
    let mut interpreter = Interpreter::new(doc);
    if base != Matrix::identity() {
        interpreter.state.ctm = base;
        interpreter.emit(OpCode::Transform, matrix_operands(&base));
    }
    interpreter.run(content, resources, 0)?;
    Ok(interpreter.out)
}

/// Fill color space families that change how `sc`/`scn` are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillSpace {
    Gray,
    Rgb,
    Cmyk,
    Other,
}

#[derive(Debug, Clone)]
struct TextParams {
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
    font_size: f64,
    font: Option<Rc<PdfFont>>,
    font_name: String,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            font_size: 0.0,
            font: None,
            font_name: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct State {
    ctm: Matrix,
    fill_space: FillSpace,
    text: TextParams,
}

impl Default for State {
    fn default() -> Self {
        Self {
            ctm: Matrix::identity(),
            fill_space: FillSpace::Gray,
            text: TextParams::default(),
        }
    }
}

struct Interpreter<'a> {
    doc: &'a Document,
    state: State,
    stack: Vec<State>,
    tm: Matrix,
    tlm: Matrix,
    font_cache: HashMap<ObjectId, Rc<PdfFont>>,
    out: PageContent,
}

impl<'a> Interpreter<'a> {
    fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            state: State::default(),
            stack: Vec::new(),
            tm: Matrix::identity(),
            tlm: Matrix::identity(),
            font_cache: HashMap::new(),
            out: PageContent::default(),
        }
    }

    fn emit(&mut self, code: OpCode, args: Vec<Operand>) {
        self.out.operators.push(code, args);
    }

    fn run(&mut self, content: &[u8], resources: &'a Dictionary, depth: usize) -> Result<()> {
        let content = Content::decode(content)
            .map_err(|e| Error::PdfParseError(format!("content stream decode error: {}", e)))?;

        for op in &content.operations {
            self.operation(op, resources, depth)?;
        }
        Ok(())
    }

    fn operation(&mut self, op: &Operation, resources: &'a Dictionary, depth: usize) -> Result<()> {
        let args = &op.operands;
        match op.operator.as_str() {
            "q" => {
                self.stack.push(self.state.clone());
                self.emit(OpCode::Save, Vec::new());
            }
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
                self.emit(OpCode::Restore, Vec::new());
            }
            "cm" => {
                if let Some(m) = numbers(self.doc, args).as_deref().and_then(Matrix::from_slice) {
                    self.state.ctm = m.concat(&self.state.ctm);
                }
                self.emit(OpCode::Transform, operands(args));
            }

            "g" => {
                self.state.fill_space = FillSpace::Gray;
                self.emit(OpCode::SetFillGray, operands(args));
            }
            "rg" => {
                self.state.fill_space = FillSpace::Rgb;
                self.emit(OpCode::SetFillRgb, operands(args));
            }
            "k" => {
                self.state.fill_space = FillSpace::Cmyk;
                self.set_cmyk(args);
            }
            "cs" => {
                let space = match args.first().and_then(|o| o.as_name().ok()) {
                    Some(name) => self.fill_space(name, resources),
                    None => FillSpace::Other,
                };
                self.state.fill_space = space;
                // Selecting a color space resets the color to its initial value.
                if space != FillSpace::Other {
                    self.emit(OpCode::SetFillGray, vec![Operand::Number(0.0)]);
                }
            }
            "sc" | "scn" => {
                let code = if op.operator == "sc" {
                    OpCode::SetFillColor
                } else {
                    OpCode::SetFillColorN
                };
                match self.state.fill_space {
                    FillSpace::Cmyk if args.len() == 4 => self.set_cmyk(args),
                    // Spot, indexed and pattern colors keep the current fill.
                    FillSpace::Other => log::debug!("Ignoring fill color in unsupported color space"),
                    _ => self.emit(code, operands(args)),
                }
            }

            "BT" => {
                self.tm = Matrix::identity();
                self.tlm = Matrix::identity();
            }
            "Tc" => self.with_number(args, |t, v| t.char_spacing = v),
            "Tw" => self.with_number(args, |t, v| t.word_spacing = v),
            "Tz" => self.with_number(args, |t, v| t.horizontal_scale = v / 100.0),
            "TL" => self.with_number(args, |t, v| t.leading = v),
            "Ts" => self.with_number(args, |t, v| t.rise = v),
            "Tf" => {
                if let (Some(name), Some(size)) = (
                    args.first().and_then(|o| o.as_name().ok()),
                    args.get(1).and_then(number),
                ) {
                    let name = String::from_utf8_lossy(name).into_owned();
                    let font = self.font(&name, resources);
                    self.out.fonts.insert(name.clone(), font.info.clone());
                    self.state.text.font = Some(font);
                    self.state.text.font_name = name;
                    self.state.text.font_size = size;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (arg(args, 0), arg(args, 1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (arg(args, 0), arg(args, 1)) {
                    self.state.text.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = numbers(self.doc, args).as_deref().and_then(Matrix::from_slice) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),

            "Tj" => {
                if let Some(bytes) = string_arg(args.first()) {
                    let text = self.show(bytes);
                    self.emit(OpCode::ShowText, vec![Operand::Text(text)]);
                }
            }
            "'" => {
                self.next_line();
                if let Some(bytes) = string_arg(args.first()) {
                    let text = self.show(bytes);
                    self.emit(OpCode::NextLineShowText, vec![Operand::Text(text)]);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac), Some(bytes)) =
                    (arg(args, 0), arg(args, 1), string_arg(args.get(2)))
                {
                    self.state.text.word_spacing = aw;
                    self.state.text.char_spacing = ac;
                    self.next_line();
                    let text = self.show(bytes);
                    self.emit(
                        OpCode::NextLineSetSpacingShowText,
                        vec![Operand::Number(aw), Operand::Number(ac), Operand::Text(text)],
                    );
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = args.first() {
                    let mut parts = Vec::with_capacity(items.len());
                    for item in items {
                        if let Some(bytes) = string_arg(Some(item)) {
                            parts.push(Operand::Text(self.show(bytes)));
                        } else if let Some(adjust) = number(item) {
                            self.kern(adjust);
                            parts.push(Operand::Number(adjust));
                        }
                    }
                    self.emit(OpCode::ShowSpacedText, vec![Operand::Array(parts)]);
                }
            }

            "Do" => {
                if let Some(name) = args.first().and_then(|o| o.as_name().ok()) {
                    let name = String::from_utf8_lossy(name).into_owned();
                    self.paint_xobject(&name, resources, depth)?;
                }
            }
            "BI" => self.emit(OpCode::PaintInlineImage, Vec::new()),

            _ => {}
        }
        Ok(())
    }

    fn with_number(&mut self, args: &[Object], set: impl FnOnce(&mut TextParams, f64)) {
        if let Some(v) = arg(args, 0) {
            set(&mut self.state.text, v);
        }
    }

    fn set_cmyk(&mut self, args: &[Object]) {
        match numbers(self.doc, args).as_deref() {
            Some([c, m, y, k]) => {
                let rgb = RgbColor::from_cmyk(*c, *m, *y, *k);
                self.emit(
                    OpCode::SetFillRgb,
                    [rgb.r, rgb.g, rgb.b]
                        .into_iter()
                        .map(|v| Operand::Number(v as f64 / 255.0))
                        .collect(),
                );
            }
            _ => log::debug!("Skipping malformed CMYK color: {:?}", args),
        }
    }

    fn fill_space(&self, name: &[u8], resources: &Dictionary) -> FillSpace {
        match name {
            b"DeviceGray" | b"CalGray" | b"G" => FillSpace::Gray,
            b"DeviceRGB" | b"CalRGB" | b"RGB" => FillSpace::Rgb,
            b"DeviceCMYK" | b"CMYK" => FillSpace::Cmyk,
            _ => {
                // Named spaces: ICC profiles tell their component count.
                let space = get_dict(self.doc, resources, b"ColorSpace")
                    .and_then(|spaces| get(self.doc, spaces, name));
                match space {
                    Some(Object::Name(inner)) => self.fill_space(inner, resources),
                    Some(Object::Array(parts)) => {
                        let family = parts.first().and_then(|o| o.as_name().ok());
                        let components = parts
                            .get(1)
                            .map(|o| crate::objects::resolve(self.doc, o))
                            .and_then(|o| o.as_stream().ok())
                            .and_then(|s| s.dict.get(b"N").ok())
                            .and_then(number);
                        match (family, components) {
                            (Some(b"ICCBased"), Some(n)) if n == 1.0 => FillSpace::Gray,
                            (Some(b"ICCBased"), Some(n)) if n == 3.0 => FillSpace::Rgb,
                            (Some(b"ICCBased"), Some(n)) if n == 4.0 => FillSpace::Cmyk,
                            (Some(b"CalRGB"), _) => FillSpace::Rgb,
                            (Some(b"CalGray"), _) => FillSpace::Gray,
                            _ => FillSpace::Other,
                        }
                    }
                    _ => FillSpace::Other,
                }
            }
        }
    }

    fn font(&mut self, name: &str, resources: &Dictionary) -> Rc<PdfFont> {
        let entry = get_dict(self.doc, resources, b"Font")
            .and_then(|fonts| fonts.get(name.as_bytes()).ok());

        let Some(entry) = entry else {
            log::warn!("Font resource /{} not found; using defaults", name);
            return Rc::new(PdfFont::missing(name));
        };

        if let Object::Reference(id) = entry {
            if let Some(font) = self.font_cache.get(id) {
                return Rc::clone(font);
            }
        }

        let font = match crate::objects::resolve(self.doc, entry).as_dict() {
            Ok(dict) => Rc::new(PdfFont::load(self.doc, dict)),
            Err(_) => {
                log::warn!("Font resource /{} is not a dictionary", name);
                Rc::new(PdfFont::missing(name))
            }
        };
        if let Object::Reference(id) = entry {
            self.font_cache.insert(*id, Rc::clone(&font));
        }
        font
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translate(tx, ty).concat(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    /// Apply a `TJ` number (thousandths of text space, subtracted).
    fn kern(&mut self, adjust: f64) {
        let t = &self.state.text;
        let tx = -adjust / 1000.0 * t.font_size * t.horizontal_scale;
        self.tm = Matrix::translate(tx, 0.0).concat(&self.tm);
    }

    /// Show one string: record a text item and advance the text matrix.
    /// Returns the decoded text.
    fn show(&mut self, bytes: &[u8]) -> String {
        let t = &self.state.text;
        let glyphs = match &t.font {
            Some(font) => font.decode(bytes),
            None => PdfFont::missing(&t.font_name).decode(bytes),
        };

        let raw: String = glyphs.iter().map(|g| g.text.as_str()).collect();
        let text = normalize_glyph_text(&raw);

        let advance: f64 = glyphs
            .iter()
            .map(|g| {
                let spacing = if g.is_word_space { t.word_spacing } else { 0.0 };
                (g.width / 1000.0 * t.font_size + t.char_spacing + spacing) * t.horizontal_scale
            })
            .sum();

        let user_tm = self.tm.concat(&self.state.ctm);
        let rendering = Matrix::new(
            t.font_size * t.horizontal_scale,
            0.0,
            0.0,
            t.font_size,
            0.0,
            t.rise,
        )
        .concat(&user_tm);

        if !text.is_empty() {
            self.out.text_items.push(TextItem {
                text: text.clone(),
                transform: rendering,
                width: advance * user_tm.x_scale(),
                font_name: t.font_name.clone(),
            });
        }

        self.tm = Matrix::translate(advance, 0.0).concat(&self.tm);
        text
    }

    fn paint_xobject(&mut self, name: &str, resources: &'a Dictionary, depth: usize) -> Result<()> {
        let doc = self.doc;
        let stream = get_dict(doc, resources, b"XObject")
            .and_then(|xobjects| get(doc, xobjects, name.as_bytes()))
            .and_then(|obj| obj.as_stream().ok());
        let Some(stream) = stream else {
            log::warn!("XObject /{} not found in resources", name);
            return Ok(());
        };

        match get_name(doc, &stream.dict, b"Subtype").as_deref() {
            Some("Image") => {
                let is_mask = stream
                    .dict
                    .get(b"ImageMask")
                    .ok()
                    .and_then(|o| o.as_bool().ok())
                    .unwrap_or(false);
                let code = if is_mask {
                    OpCode::PaintImageMask
                } else {
                    OpCode::PaintImageXObject
                };
                self.emit(code, vec![Operand::Name(name.to_string())]);
                Ok(())
            }
            Some("Form") => self.paint_form(name, stream, resources, depth),
            other => {
                log::debug!("Ignoring XObject /{} of subtype {:?}", name, other);
                Ok(())
            }
        }
    }

    fn paint_form(
        &mut self,
        name: &str,
        stream: &'a lopdf::Stream,
        parent_resources: &'a Dictionary,
        depth: usize,
    ) -> Result<()> {
        if depth >= MAX_FORM_DEPTH {
            log::warn!("Form XObject /{} nested deeper than {} levels; skipped", name, MAX_FORM_DEPTH);
            return Ok(());
        }

        let bytes = match stream_bytes(stream) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Cannot decode Form XObject /{}: {}", name, e);
                return Ok(());
            }
        };
        let resources = get_dict(self.doc, &stream.dict, b"Resources").unwrap_or(parent_resources);

        let saved_depth = self.stack.len();
        let (saved_tm, saved_tlm) = (self.tm, self.tlm);
        self.stack.push(self.state.clone());
        self.emit(OpCode::Save, Vec::new());

        let matrix = get_array(self.doc, &stream.dict, b"Matrix")
            .and_then(|m| numbers(self.doc, m))
            .and_then(|m| Matrix::from_slice(&m));
        if let Some(m) = matrix {
            self.state.ctm = m.concat(&self.state.ctm);
            self.emit(OpCode::Transform, matrix_operands(&m));
        }

        let result = self.run(&bytes, resources, depth + 1);

        self.stack.truncate(saved_depth + 1);
        if let Some(saved) = self.stack.pop() {
            self.state = saved;
        }
        self.tm = saved_tm;
        self.tlm = saved_tlm;
        self.emit(OpCode::Restore, Vec::new());

        result
    }
}

fn arg(args: &[Object], index: usize) -> Option<f64> {
    args.get(index).and_then(number)
}

fn string_arg(obj: Option<&Object>) -> Option<&[u8]> {
    match obj {
        Some(Object::String(bytes, _)) => Some(bytes.as_slice()),
        _ => None,
    }
}

fn matrix_operands(m: &Matrix) -> Vec<Operand> {
    m.to_array().into_iter().map(Operand::Number).collect()
}

/// Convert non-text operands. Strings here are not glyph codes.
fn operands(args: &[Object]) -> Vec<Operand> {
    args.iter().filter_map(operand).collect()
}

fn operand(obj: &Object) -> Option<Operand> {
    match obj {
        Object::Integer(_) | Object::Real(_) => number(obj).map(Operand::Number),
        Object::Name(name) => Some(Operand::Name(String::from_utf8_lossy(name).into_owned())),
        Object::String(bytes, _) => Some(Operand::Text(String::from_utf8_lossy(bytes).into_owned())),
        Object::Array(items) => Some(Operand::Array(operands(items))),
        _ => None,
    }
}
