//! PDF report rendering.
//!
//! A report is a plain, paginated summary: title, scenario name, recipient,
//! generation time, then every input and every result as labelled lines in
//! declaration order. Text is written uncompressed with the built-in
//! Helvetica faces, so no font files are needed.
//!
//! Rendering can run on a worker thread via [`RenderJob`]. The job hands
//! the finished bytes back over a channel; callers block on that signal,
//! never on a timer.

use crate::{
    clock::SharedClock,
    engine::{Ratio, SimulationResult},
    error::{RoiError, RoiResult},
    input::SimulationInput,
};
use chrono::SecondsFormat;
use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, ObjectId, Stream,
};
use std::sync::{
    mpsc::{self, Receiver, RecvTimeoutError},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

pub const REPORT_TITLE: &str = "Invoicing ROI Report";

// US Letter, in points.
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;
const FOOTER_Y: i64 = 40;
/// Rough Helvetica 12pt capacity of one text line between the margins.
const WRAP_COLUMNS: usize = 80;

/// Turns a scenario and its result into a document.
pub trait ReportRenderer: Send + Sync {
    fn render(
        &self,
        input: &SimulationInput,
        result: &SimulationResult,
        recipient: &str,
    ) -> RoiResult<Vec<u8>>;
}

/// Renders with the standard Helvetica faces in WinAnsi encoding. Text is
/// limited to Latin-1: any other character (for example in an
/// internationalized recipient address) is printed as `?`.
pub struct PdfReportRenderer {
    clock: SharedClock,
}

impl PdfReportRenderer {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(
        &self,
        input: &SimulationInput,
        result: &SimulationResult,
        recipient: &str,
    ) -> RoiResult<Vec<u8>> {
        check_complete(input, result, recipient)?;

        let generated_at = self.clock.now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let lines = report_lines(input, result, recipient, &generated_at);
        let pages = paginate(&lines);
        let bytes = write_pdf(&pages, &generated_at)?;

        log::debug!(
            "rendered report for '{}': {} page(s), {} bytes",
            input.scenario_name,
            pages.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

/// `monthly_invoice_volume` → `Monthly invoice volume`.
pub fn field_label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Attachment name for a scenario's report.
pub fn report_filename(scenario_name: &str) -> String {
    let sanitized: String = scenario_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if sanitized.is_empty() {
        "Unnamed"
    } else {
        sanitized.as_str()
    };
    format!("ROI_Report_{stem}.pdf")
}

fn check_complete(
    input: &SimulationInput,
    result: &SimulationResult,
    recipient: &str,
) -> RoiResult<()> {
    if recipient.trim().is_empty() {
        return Err(RoiError::RenderFailed("recipient is missing".into()));
    }
    if input.scenario_name.trim().is_empty() {
        return Err(RoiError::RenderFailed("scenario_name is missing".into()));
    }
    for (field, value) in input.inputs.labeled_fields() {
        if !value.is_finite() {
            return Err(RoiError::RenderFailed(format!("input {field} has no value")));
        }
    }
    for (field, value) in result.labeled_fields() {
        if let Ratio::Defined(v) = value {
            if !v.is_finite() {
                return Err(RoiError::RenderFailed(format!("result {field} has no value")));
            }
        }
    }
    Ok(())
}

// ── Layout ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Style {
    Title,
    Heading,
    Body,
    Gap,
}

impl Style {
    fn font(self) -> (&'static str, i64) {
        match self {
            Style::Title => ("F2", 18),
            Style::Heading => ("F2", 14),
            Style::Body | Style::Gap => ("F1", 12),
        }
    }

    fn advance(self) -> i64 {
        match self {
            Style::Title => 30,
            Style::Heading => 22,
            Style::Body => 16,
            Style::Gap => 10,
        }
    }
}

#[derive(Debug, Clone)]
struct Line {
    style: Style,
    text: String,
}

impl Line {
    fn new(style: Style, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

fn report_lines(
    input: &SimulationInput,
    result: &SimulationResult,
    recipient: &str,
    generated_at: &str,
) -> Vec<Line> {
    let mut lines = vec![Line::new(Style::Title, REPORT_TITLE), Line::new(Style::Gap, "")];

    let mut body = |text: String| {
        for piece in wrap(&text, WRAP_COLUMNS) {
            lines.push(Line::new(Style::Body, piece));
        }
    };
    body(format!("Scenario name: {}", input.scenario_name));
    body(format!("Recipient: {recipient}"));
    body(format!("Generated on: {generated_at}"));

    lines.push(Line::new(Style::Gap, ""));
    lines.push(Line::new(Style::Heading, "Input Summary"));
    for (field, value) in input.inputs.labeled_fields() {
        lines.push(Line::new(Style::Body, format!("{}: {value}", field_label(field))));
    }

    lines.push(Line::new(Style::Gap, ""));
    lines.push(Line::new(Style::Heading, "Simulation Results"));
    for (field, value) in result.labeled_fields() {
        lines.push(Line::new(Style::Body, format!("{}: {value:.2}", field_label(field))));
    }
    lines
}

/// Greedy word wrap. A single word longer than `width` stays whole.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    out.push(current);
    out
}

fn paginate(lines: &[Line]) -> Vec<Vec<Line>> {
    let usable = PAGE_HEIGHT - 2 * MARGIN;
    let mut pages: Vec<Vec<Line>> = vec![Vec::new()];
    let mut used = 0;

    for line in lines {
        if used + line.style.advance() > usable && used > 0 {
            pages.push(Vec::new());
            used = 0;
            // A gap at the top of a fresh page is noise.
            if line.style == Style::Gap {
                continue;
            }
        }
        used += line.style.advance();
        if let Some(page) = pages.last_mut() {
            page.push(line.clone());
        }
    }
    pages
}

// ── PDF assembly ────────────────────────────────────────────────────

fn write_pdf(pages: &[Vec<Line>], generated_at: &str) -> RoiResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let total = pages.len();
    let mut kids: Vec<Object> = Vec::with_capacity(total);
    for (index, page) in pages.iter().enumerate() {
        let content = page_content(page, index + 1, total);
        let encoded = content
            .encode()
            .map_err(|e| RoiError::RenderFailed(format!("encoding page {}: {e}", index + 1)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(REPORT_TITLE),
        "Producer" => Object::string_literal(concat!("roi-core ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(generated_at),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RoiError::RenderFailed(format!("writing document: {e}")))?;
    Ok(bytes)
}

fn page_content(lines: &[Line], page_number: usize, page_count: usize) -> Content {
    let mut operations = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        y -= line.style.advance();
        if line.style == Style::Gap {
            continue;
        }
        let x = match line.style {
            Style::Title => centered_x(&line.text, line.style.font().1),
            _ => MARGIN,
        };
        push_text(&mut operations, line.style.font(), x, y, &line.text);
    }

    let footer = format!("Page {page_number} of {page_count}");
    push_text(&mut operations, ("F1", 9), MARGIN, FOOTER_Y, &footer);

    Content { operations }
}

fn push_text(ops: &mut Vec<Operation>, (font, size): (&str, i64), x: i64, y: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]));
    ops.push(Operation::new("ET", vec![]));
}

/// Approximate centring; Helvetica glyphs average about half the font size.
fn centered_x(text: &str, size: i64) -> i64 {
    let width = text.chars().count() as i64 * size / 2;
    ((PAGE_WIDTH - width) / 2).max(MARGIN)
}

/// Latin-1 subset of WinAnsi; anything outside it prints as `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

// ── Background rendering ────────────────────────────────────────────

/// A render running on its own thread.
///
/// The worker sends its outcome exactly once; `wait` and `wait_timeout`
/// block on that message.
pub struct RenderJob {
    done: Receiver<RoiResult<Vec<u8>>>,
    worker: Option<JoinHandle<()>>,
}

impl RenderJob {
    pub fn spawn<R>(
        renderer: Arc<R>,
        input: SimulationInput,
        result: SimulationResult,
        recipient: String,
    ) -> RoiResult<Self>
    where
        R: ReportRenderer + ?Sized + 'static,
    {
        let (tx, done) = mpsc::sync_channel(1);
        let worker = std::thread::Builder::new()
            .name("roi-report".into())
            .spawn(move || {
                let outcome = renderer.render(&input, &result, &recipient);
                // The receiver may have timed out and gone away.
                let _ = tx.send(outcome);
            })
            .map_err(|e| RoiError::RenderFailed(format!("starting render worker: {e}")))?;

        Ok(Self {
            done,
            worker: Some(worker),
        })
    }

    /// Block until the document is finished.
    pub fn wait(mut self) -> RoiResult<Vec<u8>> {
        let outcome = self.done.recv().map_err(|_| worker_lost())?;
        self.join();
        outcome
    }

    /// Block until the document is finished or `timeout` elapses.
    pub fn wait_timeout(mut self, timeout: Duration) -> RoiResult<Vec<u8>> {
        match self.done.recv_timeout(timeout) {
            Ok(outcome) => {
                self.join();
                outcome
            }
            Err(RecvTimeoutError::Timeout) => Err(RoiError::RenderFailed(format!(
                "render did not complete within {timeout:?}"
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(worker_lost()),
        }
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("render worker panicked after signalling completion");
            }
        }
    }
}

fn worker_lost() -> RoiError {
    RoiError::RenderFailed("render worker exited without a result".into())
}
