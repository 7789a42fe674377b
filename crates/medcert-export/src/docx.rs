use std::io::Cursor;

use docx_rs::{
    AlignmentType, BreakType, DeleteChild, DeleteText, DocumentChild, Docx, InsertChild,
    PageMargin, Paragraph, ParagraphChild, Run, RunChild, RunFonts, Style, StyleType, Table,
    TableCell, TableCellContent, TableChild, TableRow, TableRowChild, Text,
};
use serde::Serialize;

use crate::error::ExportError;
use crate::placeholder::{Block, Replacements, TextBlock, find_placeholders, substitute_block};
use crate::styles::DocumentStyles;

/// A4 in twentieths of a point.
const A4_WIDTH_TWIPS: u32 = 11_906;
const A4_HEIGHT_TWIPS: u32 = 16_838;

/// The clinic declaration in the line markup understood by
/// [`default_template`]. The signature key is split between a bold and a
/// regular run, the way an edited Word file usually stores it.
const DEFAULT_TEMPLATE: &str = "\
^ **{clinica_nome} | {clinica_slogan}**
~ {clinica_servicos}
# DECLARAÇÃO

Declaro que o Sr. (A) **{nome_paciente}** de **{documento_paciente_formatado}**. Compareceu a esta clínica com objetivo de submeter-se a avaliação médica administrativa em virtude do atestado médico data do **{data_atestado}** em que foi sugerido afastamento pelo período de **{qtd_dias_atestado} dia(s)** com CID: **{código_cid}** emitido (a) pelo (a) Dr. (a) **{nome_medico}**{crm__medico}-{uf_crm_medico}.

## APÓS AVALIAÇÃO CLÍNICA, FOI DECIDIDO:
- Afastamento Total:
- Afastamento parcial pelo período de:
- Negada licença médica por motivo de doença:
^ Caso o paciente não se sinta apto para retornar ao trabalho, deverá retornar ao médico assistente para uma nova avaliação.


^ ____________________________________________
^ Médico do trabalho / Examinador
^ **{clinica_cidade}, {data_atestado}**

^ **{clinica_razao_social}**
~ {clinica_endereco}
---
^ **{clinica_nome} | {clinica_slogan}**
~ {clinica_servicos}
# PRONTUÁRIO DE PERÍCIA MÉDICA
| **NOME:** {nome_paciente}
| **EMPRESA:** {empresa_paciente}
| **CARGO:** {cargo_paciente}
| **CID10:** {código_cid}
| **DATA DO ATESTADO:** {data_atestado} | **Nº DE DIAS DE AFASTAMENTO:** {qtd_dias_atestado}
| **IDENTIFICAÇÃO DO PROFISSIONAL DE SAÚDE QUE FORNECEU O ATESTADO:** Dr. (a) {nome_medico}{crm__medico}-{uf_crm_medico}

## OBSERVAÇÕES / ANOTAÇÕES DO MÉDICO EXAMINADOR:




## APÓS AVALIAÇÃO CLÍNICA, FOI DECIDIDO:
- Afastamento Total:
- Afastamento parcial pelo período de:
- Negada licença médica por motivo de doença:


^ ____________________________________________
^ Médico do trabalho / Examinador
^ **{clinica_cidade}, {data_atual}**

^ **{clinica_razao_social}**
~ {clinica_endereco}
";

/// Substitute placeholders in a `.docx` template and repack it.
///
/// Every body paragraph and every paragraph of every table cell (nested
/// tables included) is treated as one block: placeholders split across
/// runs are found on the block's concatenated text.
///
/// docx-rs reads text unescaped but writes it verbatim, so every text node
/// that was not rewritten is escaped again before packing.
pub fn render_docx_template(
    template: &[u8],
    replacements: &Replacements,
) -> Result<Vec<u8>, ExportError> {
    let mut docx =
        docx_rs::read_docx(template).map_err(|e| ExportError::TemplateParse(e.to_string()))?;

    let mut rewritten = 0usize;
    for_each_paragraph(&mut docx, &mut |paragraph| {
        let changed = substitute_block(paragraph, replacements);
        if changed {
            rewritten += 1;
        }
        let skipped = find_placeholders(&nested_text(&paragraph.children));
        if !skipped.is_empty() {
            tracing::warn!(?skipped, "placeholders inside hyperlinks or insertions left as is");
        }
        escape_read_text(&mut paragraph.children, !changed);
    });
    tracing::debug!(rewritten, "substituted docx template");

    pack(docx)
}

/// Build the clinic declaration from code, for when no template file is
/// configured. The result still carries placeholders; feed it through
/// [`render_docx_template`].
pub fn default_template(styles: &DocumentStyles) -> Result<Vec<u8>, ExportError> {
    build_from_markup(DEFAULT_TEMPLATE, styles)
}

/// Build a DOCX from the line markup used for the built-in template:
///
/// - `# Title` → centred title
/// - `## Heading` → section heading
/// - `^ text` → centred paragraph
/// - `~ text` → centred small print
/// - `- item` → checkbox line
/// - `| cell | cell` → table row (consecutive rows form one table)
/// - `**bold**` → bold run
/// - `---` → page break
/// - Everything else → justified paragraph
pub fn build_from_markup(markup: &str, styles: &DocumentStyles) -> Result<Vec<u8>, ExportError> {
    let margin = styles.margin_twips();
    let mut docx = Docx::new()
        .page_size(A4_WIDTH_TWIPS, A4_HEIGHT_TWIPS)
        .page_margin(
            PageMargin::new()
                .top(margin)
                .bottom(margin)
                .left(margin)
                .right(margin),
        )
        .add_style(heading_style("Title", "title", styles.title_size))
        .add_style(heading_style("Heading2", "heading 2", styles.heading_size));

    let mut rows: Vec<Vec<&str>> = Vec::new();
    for line in markup.lines() {
        let trimmed = line.trim();

        if let Some(row) = trimmed.strip_prefix("| ") {
            rows.push(row.split(" | ").collect());
            continue;
        }
        if !rows.is_empty() {
            docx = docx.add_table(table(&rows, styles));
            rows.clear();
        }

        if trimmed.is_empty() {
            docx = docx.add_paragraph(Paragraph::new());
        } else if let Some(text) = trimmed.strip_prefix("## ") {
            docx = docx.add_paragraph(heading_paragraph(text, "Heading2", AlignmentType::Left, styles));
        } else if let Some(text) = trimmed.strip_prefix("# ") {
            docx = docx.add_paragraph(heading_paragraph(text, "Title", AlignmentType::Center, styles));
        } else if let Some(text) = trimmed.strip_prefix("^ ") {
            docx = docx.add_paragraph(inline_paragraph(
                text,
                AlignmentType::Center,
                styles.body_size,
                styles,
            ));
        } else if let Some(text) = trimmed.strip_prefix("~ ") {
            docx = docx.add_paragraph(inline_paragraph(
                text,
                AlignmentType::Center,
                styles.small_size,
                styles,
            ));
        } else if let Some(text) = trimmed.strip_prefix("- ") {
            docx = docx.add_paragraph(checkbox_paragraph(text, styles));
        } else if trimmed == "---" {
            docx = docx.add_paragraph(
                Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
            );
        } else {
            docx = docx.add_paragraph(inline_paragraph(
                trimmed,
                AlignmentType::Both,
                styles.body_size,
                styles,
            ));
        }
    }
    if !rows.is_empty() {
        docx = docx.add_table(table(&rows, styles));
    }

    pack(docx)
}

/// What a template contains, for checking a clinic-supplied file before
/// putting it into service.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateReport {
    /// Every non-empty paragraph, as its run texts.
    pub blocks: Vec<Block>,
    /// Placeholders found on the concatenated paragraph texts.
    pub placeholders: Vec<String>,
    /// Placeholders that no single run contains whole.
    pub split_placeholders: Vec<String>,
    /// Text inside hyperlinks and tracked insertions. Placeholders there are
    /// left as they are on render.
    pub unreachable_text: Vec<String>,
}

pub fn inspect_docx_template(template: &[u8]) -> Result<TemplateReport, ExportError> {
    let mut docx =
        docx_rs::read_docx(template).map_err(|e| ExportError::TemplateParse(e.to_string()))?;

    let mut blocks = Vec::new();
    let mut unreachable_text = Vec::new();
    for_each_paragraph(&mut docx, &mut |paragraph| {
        let block = Block::new(paragraph.run_texts());
        if !block.text().trim().is_empty() {
            blocks.push(block);
        }
        let nested = nested_text(&paragraph.children);
        if !nested.trim().is_empty() {
            unreachable_text.push(nested);
        }
    });

    let mut placeholders: Vec<String> = Vec::new();
    let mut split_placeholders: Vec<String> = Vec::new();
    for block in &blocks {
        for token in find_placeholders(&block.text()) {
            let whole = block.runs.iter().any(|run| run.contains(token.as_str()));
            if !whole && !split_placeholders.contains(&token) {
                split_placeholders.push(token.clone());
            }
            if !placeholders.contains(&token) {
                placeholders.push(token);
            }
        }
    }

    Ok(TemplateReport {
        blocks,
        placeholders,
        split_placeholders,
        unreachable_text,
    })
}

impl TextBlock for Paragraph {
    fn run_texts(&self) -> Vec<String> {
        self.children
            .iter()
            .filter_map(|child| match child {
                ParagraphChild::Run(run) => Some(run_text(run)),
                _ => None,
            })
            .collect()
    }

    fn rewrite(&mut self, text: String) {
        let mut runs = self.children.iter_mut().filter_map(|child| match child {
            ParagraphChild::Run(run) => Some(run),
            _ => None,
        });
        match runs.next() {
            Some(first) => {
                set_run_text(first, text);
                for run in runs {
                    set_run_text(run, String::new());
                }
            }
            None => self
                .children
                .push(ParagraphChild::Run(Box::new(Run::new().add_text(text)))),
        }
    }
}

/// Text of the hyperlinks and insertions among `children`, which
/// [`TextBlock::run_texts`] does not see.
fn nested_text(children: &[ParagraphChild]) -> String {
    let mut text = String::new();
    for child in children {
        match child {
            ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    match inner {
                        ParagraphChild::Run(run) => text.push_str(&run_text(run)),
                        other => text.push_str(&nested_text(std::slice::from_ref(other))),
                    }
                }
            }
            ParagraphChild::Insert(insert) => {
                for inner in &insert.children {
                    if let InsertChild::Run(run) = inner {
                        text.push_str(&run_text(run));
                    }
                }
            }
            _ => {}
        }
    }
    text
}

fn run_text(run: &Run) -> String {
    run.children
        .iter()
        .filter_map(|child| match child {
            RunChild::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect()
}

/// Replace the text children of `run`, leaving breaks, tabs and drawings in
/// place. The new text takes the position of the first old one.
fn set_run_text(run: &mut Run, text: String) {
    let at = run
        .children
        .iter()
        .position(|child| matches!(child, RunChild::Text(_)));
    run.children
        .retain(|child| !matches!(child, RunChild::Text(_)));
    if text.is_empty() {
        return;
    }
    let child = RunChild::Text(Text::new(text));
    match at {
        Some(index) => run.children.insert(index.min(run.children.len()), child),
        None => run.children.push(child),
    }
}

/// Escape text nodes as read from a file. Top-level runs of a rewritten
/// paragraph already went through [`Text::new`] and are skipped.
fn escape_read_text(children: &mut [ParagraphChild], top_level_runs: bool) {
    for child in children {
        match child {
            ParagraphChild::Run(run) if top_level_runs => escape_run(run),
            ParagraphChild::Hyperlink(link) => escape_read_text(&mut link.children, true),
            ParagraphChild::Insert(insert) => {
                for child in &mut insert.children {
                    if let InsertChild::Run(run) = child {
                        escape_run(run);
                    }
                }
            }
            ParagraphChild::Delete(delete) => {
                for child in &mut delete.children {
                    if let DeleteChild::Run(run) = child {
                        escape_run(run);
                    }
                }
            }
            _ => {}
        }
    }
}

fn escape_run(run: &mut Run) {
    for child in &mut run.children {
        match child {
            RunChild::Text(text) => *text = Text::new(std::mem::take(&mut text.text)),
            RunChild::DeleteText(text) => {
                if let Some(escaped) = escape_delete_text(text) {
                    *text = escaped;
                }
            }
            _ => {}
        }
    }
}

// DeleteText keeps its text private; its serde form is the only way in.
fn escape_delete_text(text: &DeleteText) -> Option<DeleteText> {
    let value = serde_json::to_value(text).ok()?;
    let raw = value.get("text")?.as_str()?;
    Some(DeleteText::new(raw))
}

fn for_each_paragraph(docx: &mut Docx, visit: &mut impl FnMut(&mut Paragraph)) {
    for child in &mut docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => visit(paragraph.as_mut()),
            DocumentChild::Table(table) => visit_table(table, visit),
            _ => {}
        }
    }
}

fn visit_table(table: &mut Table, visit: &mut impl FnMut(&mut Paragraph)) {
    for row in &mut table.rows {
        let TableChild::TableRow(row) = row;
        for cell in &mut row.cells {
            let TableRowChild::TableCell(cell) = cell;
            for content in &mut cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => visit(paragraph),
                    TableCellContent::Table(nested) => visit_table(nested, visit),
                    _ => {}
                }
            }
        }
    }
}

fn pack(docx: Docx) -> Result<Vec<u8>, ExportError> {
    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| ExportError::Docx(e.to_string()))?;

    Ok(buf.into_inner())
}

fn heading_style(style_id: &str, name: &str, size_pt: usize) -> Style {
    Style::new(style_id, StyleType::Paragraph)
        .name(name)
        .size(size_pt * 2) // OOXML uses half-points
}

fn heading_paragraph(
    text: &str,
    style_id: &str,
    align: AlignmentType,
    styles: &DocumentStyles,
) -> Paragraph {
    Paragraph::new().style(style_id).align(align).add_run(
        Run::new()
            .add_text(text)
            .bold()
            .fonts(RunFonts::new().ascii(&styles.heading_font)),
    )
}

fn checkbox_paragraph(text: &str, styles: &DocumentStyles) -> Paragraph {
    let box_run = Run::new()
        .add_text("\u{2610} ")
        .fonts(RunFonts::new().ascii(&styles.body_font));

    let mut para = Paragraph::new()
        .align(AlignmentType::Left)
        .add_run(box_run);

    for run in parse_inline(text, styles.body_size, styles) {
        para = para.add_run(run);
    }

    para
}

fn inline_paragraph(
    text: &str,
    align: AlignmentType,
    size_pt: usize,
    styles: &DocumentStyles,
) -> Paragraph {
    let mut para = Paragraph::new().align(align);
    for run in parse_inline(text, size_pt, styles) {
        para = para.add_run(run);
    }
    para
}

/// One table; rows shorter than the widest row span their last cell.
fn table(rows: &[Vec<&str>], styles: &DocumentStyles) -> Table {
    let width = rows.iter().map(Vec::len).max().unwrap_or(1);
    let rows = rows
        .iter()
        .map(|cells| {
            let last = cells.len().saturating_sub(1);
            let cells = cells
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    let cell = TableCell::new().add_paragraph(inline_paragraph(
                        text,
                        AlignmentType::Left,
                        styles.body_size,
                        styles,
                    ));
                    if i == last && cells.len() < width {
                        cell.grid_span(width - last)
                    } else {
                        cell
                    }
                })
                .collect();
            TableRow::new(cells)
        })
        .collect();
    Table::new(rows)
}

fn styled_run(text: &str, size_pt: usize, styles: &DocumentStyles) -> Run {
    Run::new()
        .add_text(text)
        .size(size_pt * 2)
        .fonts(RunFonts::new().ascii(&styles.body_font))
}

/// Parse simple inline formatting: **bold** segments.
fn parse_inline(text: &str, size_pt: usize, styles: &DocumentStyles) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut remaining = text;

    while let Some(start) = remaining.find("**") {
        let before = &remaining[..start];
        if !before.is_empty() {
            runs.push(styled_run(before, size_pt, styles));
        }

        let after_start = &remaining[start + 2..];
        if let Some(end) = after_start.find("**") {
            runs.push(styled_run(&after_start[..end], size_pt, styles).bold());
            remaining = &after_start[end + 2..];
        } else {
            // No closing **, treat rest as normal text
            runs.push(styled_run(remaining, size_pt, styles));
            return runs;
        }
    }

    if !remaining.is_empty() {
        runs.push(styled_run(remaining, size_pt, styles));
    }

    runs
}
