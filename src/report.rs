//! Report generation: renders a tally into a paginated PDF.
//!
//! A4 pages, fixed 15 mm margins, Helvetica built-ins. The single-session
//! report carries a header with code/class and start/end timestamps, the
//! results section, and a chronological listing of every vote; the aggregate
//! summary carries the header and results only. A new page starts whenever
//! the vertical cursor passes the bottom margin.
//!
//! No side effects beyond the returned bytes; persisting a copy anywhere is
//! the caller's business.

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use crate::entity::{session, vote};
use crate::error::Result;
use crate::tally::{percent_of, AggregateTally, SessionTally};

const PAGE_W_MM: f32 = 210.0;
const PAGE_H_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;

/// Detail lines are clipped so a hostile device id cannot wrap the layout.
const MAX_LINE_CHARS: usize = 110;

/// Renders the report of a single session over its frozen (or current) vote
/// set.
pub fn render_session(
    sess: &session::Model,
    tally: &SessionTally,
    votes: &[vote::Model],
) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        format!("session_{}", sess.code),
        Mm(PAGE_W_MM),
        Mm(PAGE_H_MM),
        "content",
    );
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let mut cur = Cursor::start(&doc, doc.get_page(page).get_layer(layer));

    cur.line(
        &bold,
        14.0,
        &format!("Session summary: {} - class: {}", sess.code, sess.class_name),
        10.0,
    );
    cur.line(
        &regular,
        10.0,
        &format!("Start: {}", sess.start_ts.to_rfc3339()),
        6.0,
    );
    let end = sess
        .end_ts
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_owned());
    cur.line(&regular, 10.0, &format!("End: {end}"), 10.0);

    cur.line(&bold, 12.0, "Results:", 8.0);
    for row in &tally.rows {
        cur.line(
            &regular,
            11.0,
            &format!("{}: {} votes ({:.1}%)", row.name, row.count, row.percent),
            6.0,
        );
    }

    cur.gap(6.0);
    cur.line(&bold, 12.0, "Vote details:", 8.0);
    for v in votes {
        let txt = format!(
            "id={}, candidate_id={}, device={}, ts={}",
            v.id,
            v.candidate_id,
            v.device_id,
            v.ts.to_rfc3339()
        );
        cur.line(&regular, 9.0, &clip(&txt), 5.0);
    }

    Ok(doc.save_to_bytes()?)
}

/// Renders the aggregate summary over several sessions. No per-vote detail
/// section; percentages are over the combined total.
pub fn render_summary(codes: &[String], agg: &AggregateTally) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        "voting_summary",
        Mm(PAGE_W_MM),
        Mm(PAGE_H_MM),
        "content",
    );
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let mut cur = Cursor::start(&doc, doc.get_page(page).get_layer(layer));

    cur.line(
        &bold,
        14.0,
        &clip(&format!("Summary for sessions: {}", codes.join(", "))),
        10.0,
    );
    cur.line(
        &regular,
        10.0,
        &format!("Total votes: {}", agg.total_votes),
        10.0,
    );

    cur.line(&bold, 12.0, "Results:", 8.0);
    for row in &agg.rows {
        cur.line(
            &regular,
            11.0,
            &format!(
                "{}: {} votes ({:.1}%)",
                row.name,
                row.count,
                percent_of(row.count, agg.total_votes)
            ),
            6.0,
        );
    }

    Ok(doc.save_to_bytes()?)
}

/// Write cursor over a growing document. Tracks the vertical position and
/// opens a fresh page once a line lands past the bottom margin.
struct Cursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl<'a> Cursor<'a> {
    fn start(doc: &'a PdfDocumentReference, layer: PdfLayerReference) -> Self {
        Self {
            doc,
            layer,
            y: PAGE_H_MM - MARGIN_MM,
        }
    }

    fn line(&mut self, font: &IndirectFontRef, size: f32, text: &str, advance_mm: f32) {
        self.layer
            .use_text(text, size, Mm(MARGIN_MM), Mm(self.y), font);
        self.advance(advance_mm);
    }

    fn gap(&mut self, advance_mm: f32) {
        self.advance(advance_mm);
    }

    fn advance(&mut self, advance_mm: f32) {
        self.y -= advance_mm;
        if self.y < MARGIN_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_W_MM), Mm(PAGE_H_MM), "content");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_H_MM - MARGIN_MM;
        }
    }
}

fn clip(s: &str) -> String {
    s.chars().take(MAX_LINE_CHARS).collect()
}
