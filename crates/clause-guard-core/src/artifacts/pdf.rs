use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use super::{ArtifactError, PdfRenderer};
use crate::rewrite::{RewriteRow, RewriteSelection};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const LINE_HEIGHT_MM: f32 = 5.5;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 10.0;
/// Characters per line at `BODY_SIZE` in Helvetica across the printable width.
const WRAP_COLUMNS: usize = 95;
const LAYER_NAME: &str = "Layer 1";

/// Renders the rewrite table with printpdf's built-in Helvetica fonts, one block per clause.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintPdfRenderer;

impl PdfRenderer for PrintPdfRenderer {
    fn render(&self, title: &str, selection: &RewriteSelection) -> Result<Vec<u8>, ArtifactError> {
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            LAYER_NAME,
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        {
            let mut cursor = PageCursor {
                doc: &doc,
                layer: doc.get_page(page).get_layer(layer),
                y: PAGE_HEIGHT_MM - MARGIN_MM,
            };
            cursor.line(title, TITLE_SIZE, &bold);
            cursor.skip(1);
            for row in selection.rows() {
                write_row(&mut cursor, row, &regular, &bold);
                cursor.skip(1);
            }
        }

        doc.save_to_bytes().map_err(pdf_error)
    }
}

fn write_row(cursor: &mut PageCursor<'_>, row: &RewriteRow, regular: &IndirectFontRef, bold: &IndirectFontRef) {
    cursor.line(&format!("Clause ID: {}", row.clause_id), BODY_SIZE, bold);
    cursor.field("Original Clause", &row.original_clause, regular, bold);
    cursor.field("AI-Modified Clause", &row.ai_modified_clause, regular, bold);
    let new_risk = row
        .new_risk_level
        .map(|level| level.to_string())
        .unwrap_or_default();
    cursor.field("New Risk Level", &new_risk, regular, bold);
}

struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageCursor<'_> {
    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        if self.y < MARGIN_MM {
            self.new_page();
        }
        self.layer
            .use_text(text, size, Mm(MARGIN_MM), Mm(self.y), font);
        self.y -= LINE_HEIGHT_MM;
    }

    fn field(&mut self, label: &str, value: &str, regular: &IndirectFontRef, bold: &IndirectFontRef) {
        self.line(&format!("{label}:"), BODY_SIZE, bold);
        for line in wrap(value, WRAP_COLUMNS) {
            self.line(&line, BODY_SIZE, regular);
        }
    }

    fn skip(&mut self, lines: usize) {
        self.y -= LINE_HEIGHT_MM * lines as f32;
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT_MM - MARGIN_MM;
    }
}

fn pdf_error(err: impl std::fmt::Debug) -> ArtifactError {
    ArtifactError::Pdf(format!("{err:?}"))
}

/// Greedy word wrap by character count. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clauses::fixtures::store_with;
    use crate::rewrite::select_rewrites;

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn splits_overlong_words() {
        let lines = wrap("abcdefghij kl", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "kl"]);
    }

    #[test]
    fn empty_text_keeps_one_blank_line() {
        assert_eq!(wrap("", 10), vec![String::new()]);
    }

    #[test]
    fn renders_a_pdf_document() {
        let selection = select_rewrites(&store_with(2, 1, 3));
        let bytes = PrintPdfRenderer
            .render("AI-Rewritten Clauses Report", &selection)
            .expect("pdf should render");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_selections_span_multiple_pages() {
        let selection = select_rewrites(&store_with(40, 0, 0));
        let bytes = PrintPdfRenderer
            .render("AI-Rewritten Clauses Report", &selection)
            .expect("pdf should render");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
