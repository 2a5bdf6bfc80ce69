use std::path::{Path, PathBuf};

use genpdf::elements::{Break, FrameCellDecorator, LinearLayout, Paragraph, StyledElement, TableLayout};
use genpdf::style::{Color, Style};
use genpdf::{Alignment, Document, Element, Margins, SimplePageDecorator};
use tracing::info;

use super::{ExportDocument, ExportEntry, ExportError};

pub const DEFAULT_FONT_DIR: &str = "./fonts";
pub const DEFAULT_FONT_FAMILY: &str = "LiberationSans";

const COMPLETE_COLOR: Color = Color::Rgb(40, 167, 69);

/// Where the TTF files for the document font live: `<dir>/<family>-Regular.ttf`,
/// `-Bold`, `-Italic` and `-BoldItalic`.
#[derive(Clone, Debug)]
pub struct FontSource {
    pub dir: PathBuf,
    pub family: String,
}

impl Default for FontSource {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_FONT_DIR),
            family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }
}

pub struct PdfRenderer {
    fonts: FontSource,
}

fn p(text: &str, style: Style) -> StyledElement<Paragraph> {
    Paragraph::new(text).styled(style)
}

fn p_aligned(text: &str, style: Style, align: Alignment) -> impl Element {
    Paragraph::new(text).aligned(align).styled(style)
}

fn cell(text: &str, style: Style) -> impl Element {
    Paragraph::new(text)
        .styled(style)
        .padded(Margins::trbl(1, 1, 1, 2))
}

fn quantity(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl PdfRenderer {
    pub fn new(fonts: FontSource) -> Self {
        Self { fonts }
    }

    fn load_fonts(&self) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, ExportError> {
        genpdf::fonts::from_files(&self.fonts.dir, &self.fonts.family, None).map_err(|e| {
            ExportError::Fonts {
                dir: self.fonts.dir.display().to_string(),
                family: self.fonts.family.clone(),
                message: e.to_string(),
            }
        })
    }

    /// Renders the document to an in-memory PDF. A4, one page for typical
    /// sets; the table flows onto further pages when it does not fit.
    pub fn render(&self, doc: &ExportDocument) -> Result<Vec<u8>, ExportError> {
        let mut pdf = Document::new(self.load_fonts()?);
        pdf.set_title(doc.title.as_str());
        pdf.set_paper_size(genpdf::PaperSize::A4);

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(Margins::trbl(15, 15, 15, 15));
        pdf.set_page_decorator(decorator);

        let s_title = Style::new().with_font_size(18).bold();
        let s_meta = Style::new().with_font_size(9).with_color(Color::Greyscale(110));
        let s_head = Style::new().with_font_size(10).bold();
        let s_normal = Style::new().with_font_size(10);
        let s_done = Style::new().with_font_size(10).bold().with_color(COMPLETE_COLOR);

        pdf.push(p_aligned(&doc.title, s_title, Alignment::Center));
        pdf.push(p_aligned(
            &format!("Generado: {}", doc.generated_on.format("%Y-%m-%d")),
            s_meta,
            Alignment::Center,
        ));
        pdf.push(Break::new(1.5));

        if doc.entries.is_empty() {
            pdf.push(p("No hay productos completados aún.", s_normal));
        } else {
            let mut table = TableLayout::new(vec![4, 2, 2, 3, 2]);
            table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
            table
                .row()
                .element(cell("Producto", s_head))
                .element(cell("Requerimiento", s_head))
                .element(cell("Hecho", s_head))
                .element(cell("Restan", s_head))
                .element(cell("Fecha", s_head))
                .push()
                .map_err(|e| ExportError::Render {
                    message: e.to_string(),
                })?;
            for entry in doc.entries.iter() {
                push_entry_row(&mut table, entry, s_normal, s_done)?;
            }
            pdf.push(table);
        }

        pdf.push(Break::new(1.0));
        let mut footer = LinearLayout::vertical();
        footer.push(p(
            &format!("Total de productos: {}", doc.entries.len()),
            s_meta,
        ));
        pdf.push(footer);

        let mut buffer = Vec::new();
        pdf.render(&mut buffer).map_err(|e| ExportError::Render {
            message: e.to_string(),
        })?;
        Ok(buffer)
    }

    /// Renders into `dir` using the document's file name and returns the path.
    pub fn write_to_dir(&self, doc: &ExportDocument, dir: &Path) -> Result<PathBuf, ExportError> {
        let bytes = self.render(doc)?;
        std::fs::create_dir_all(dir).map_err(|e| ExportError::Write {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = doc.path_in(dir);
        std::fs::write(&path, bytes).map_err(|e| ExportError::Write {
            path: path.display().to_string(),
            source: e,
        })?;
        info!(path = %path.display(), entries = doc.entries.len(), "export written");
        Ok(path)
    }
}

fn push_entry_row(
    table: &mut TableLayout,
    entry: &ExportEntry,
    normal: Style,
    done: Style,
) -> Result<(), ExportError> {
    let (remainder, style) = if entry.complete {
        (format!("{} (completado)", entry.remainder), done)
    } else {
        (entry.remainder.to_string(), normal)
    };
    let date = entry
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    table
        .row()
        .element(cell(&entry.product, style))
        .element(cell(&quantity(entry.required), normal))
        .element(cell(&quantity(entry.done), normal))
        .element(cell(&remainder, style))
        .element(cell(&date, normal))
        .push()
        .map_err(|e| ExportError::Render {
            message: e.to_string(),
        })
}
