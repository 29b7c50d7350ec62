use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const LEADING: i64 = 14;
const FOOTER_Y: i64 = 32;
const BODY_WRAP_CHARS: usize = 92;

/// Everything printed on the acceptance proof.
#[derive(Debug, Clone)]
pub struct AcceptanceDocument {
    pub event_name: String,
    pub participant_full_name: String,
    pub participant_document_id: String,
    pub waiver_version: String,
    pub accepted_at: chrono::DateTime<chrono::Utc>,
    pub waiver_text_hash: String,
    pub waiver_text_raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
    Mono,
}

impl Face {
    fn resource(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
            Face::Mono => "F3",
        }
    }
}

#[derive(Debug, Clone)]
struct Line {
    face: Face,
    size: i64,
    text: String,
}

impl Line {
    fn new(face: Face, size: i64, text: impl Into<String>) -> Self {
        Self {
            face,
            size,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::new(Face::Regular, 10, "")
    }
}

/// Renders the proof of acceptance as a paginated A4 PDF.
pub fn render_acceptance_pdf(doc: &AcceptanceDocument) -> Result<Vec<u8>> {
    let pages = paginate(&layout(doc));

    let mut pdf = Document::with_version("1.5");
    let pages_id = pdf.new_object_id();
    let regular = pdf.add_object(font("Helvetica"));
    let bold = pdf.add_object(font("Helvetica-Bold"));
    let mono = pdf.add_object(font("Courier"));
    let resources_id = pdf.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
            "F3" => mono,
        },
    });

    let total = pages.len();
    let mut kids: Vec<Object> = Vec::with_capacity(total);
    for (index, lines) in pages.iter().enumerate() {
        let content = page_content(lines, index + 1, total);
        let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = pdf.add_object(dictionary! {
        "Title" => pdf_string("Aceptación de descargo de responsabilidad"),
        "Producer" => pdf_string("club_portal"),
    });
    pdf.trailer.set("Root", catalog_id);
    pdf.trailer.set("Info", info_id);

    let mut out = Vec::new();
    pdf.save_to(&mut out)?;
    Ok(out)
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn layout(doc: &AcceptanceDocument) -> Vec<Line> {
    let mut lines = vec![
        Line::new(Face::Bold, 14, "Aceptación de descargo de responsabilidad"),
        Line::blank(),
        Line::new(Face::Regular, 10, format!("Actividad: {}", doc.event_name)),
        Line::new(Face::Regular, 10, format!("Participante: {}", doc.participant_full_name)),
        Line::new(Face::Regular, 10, format!("Documento: {}", doc.participant_document_id)),
        Line::new(Face::Regular, 10, format!("Versión del texto: {}", doc.waiver_version)),
        Line::new(
            Face::Regular,
            10,
            format!(
                "Aceptado el: {}",
                doc.accepted_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            ),
        ),
        Line::new(Face::Regular, 10, "Huella SHA-256 del texto canónico:"),
        Line::new(Face::Mono, 9, doc.waiver_text_hash.clone()),
        Line::blank(),
        Line::new(Face::Bold, 11, "Texto aceptado"),
        Line::blank(),
    ];

    for paragraph in doc.waiver_text_raw.replace("\r\n", "\n").replace('\r', "\n").split('\n') {
        if paragraph.trim().is_empty() {
            lines.push(Line::blank());
            continue;
        }
        for wrapped in wrap(paragraph.trim_end(), BODY_WRAP_CHARS) {
            lines.push(Line::new(Face::Regular, 10, wrapped));
        }
    }
    lines
}

fn paginate(lines: &[Line]) -> Vec<Vec<Line>> {
    let per_page = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;
    let pages: Vec<Vec<Line>> = lines.chunks(per_page).map(<[Line]>::to_vec).collect();
    if pages.is_empty() {
        vec![Vec::new()]
    } else {
        pages
    }
}

fn page_content(lines: &[Line], page: usize, total: usize) -> Content {
    let mut operations = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;
    for line in lines {
        if !line.text.is_empty() {
            push_text(&mut operations, line, MARGIN, y);
        }
        y -= LEADING;
    }
    let footer = Line::new(Face::Regular, 8, format!("Página {page} de {total}"));
    push_text(&mut operations, &footer, MARGIN, FOOTER_Y);
    Content { operations }
}

fn push_text(operations: &mut Vec<Operation>, line: &Line, x: i64, y: i64) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new(
        "Tf",
        vec![line.face.resource().into(), line.size.into()],
    ));
    operations.push(Operation::new("Td", vec![x.into(), y.into()]));
    operations.push(Operation::new("Tj", vec![pdf_string(&line.text)]));
    operations.push(Operation::new("ET", vec![]));
}

/// Literal string in WinAnsi bytes; characters outside the code page become `?`.
fn pdf_string(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| match c {
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '–' => 0x96,
            '—' => 0x97,
            c if (c as u32) < 0x100 => c as u32 as u8,
            _ => b'?',
        })
        .collect::<Vec<u8>>();
    Object::String(bytes, StringFormat::Literal)
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            out.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(&word);
        } else {
            out.push(std::mem::replace(&mut current, word));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap("uno dos tres cuatro", 8);
        assert_eq!(lines, vec!["uno dos", "tres", "cuatro"]);
    }

    #[test]
    fn splits_words_longer_than_width() {
        let lines = wrap("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn maps_accents_to_win_ansi() {
        match pdf_string("Montaña €") {
            Object::String(bytes, _) => assert_eq!(bytes, b"Monta\xf1a \x80".to_vec()),
            other => panic!("unexpected object {other:?}"),
        }
    }
}
