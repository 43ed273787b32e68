//! Roster rendering: one bordered table per role, Managers, Contributors,
//! Viewers, each row sorted by lowercase display name.

pub mod pdf;
pub mod table;
pub mod text;

use tracing::info;

use crate::aggregate::{GroupMembership, Role, Roster};
use crate::error::RenderError;
use table::{Column, Document, PageGeometry, TableRenderer, TableStyle};
use text::HelveticaMetrics;

/// Name | Email, spanning the A4 usable width.
pub fn two_columns() -> Vec<Column> {
    vec![
        Column {
            header: "Name",
            width: 80.0,
        },
        Column {
            header: "Email",
            width: 110.0,
        },
    ]
}

/// Name | Email | Groups, spanning the A4 usable width.
pub fn three_columns() -> Vec<Column> {
    vec![
        Column {
            header: "Name",
            width: 50.0,
        },
        Column {
            header: "Email",
            width: 70.0,
        },
        Column {
            header: "Groups",
            width: 70.0,
        },
    ]
}

/// Lay out the roster. The Groups column appears when `membership` is given.
pub fn layout_roster(
    roster: &Roster,
    membership: Option<&GroupMembership>,
) -> Result<Document, RenderError> {
    let style = TableStyle::default();
    let regular = HelveticaMetrics::regular(style.body_size);
    let bold = HelveticaMetrics::bold(style.body_size);
    let title = HelveticaMetrics::bold(style.title_size);
    let columns = if membership.is_some() {
        three_columns()
    } else {
        two_columns()
    };

    let mut table = TableRenderer::new(PageGeometry::A4, style, columns, &regular, &bold, &title)?;
    for role in Role::ALL {
        let cells: Vec<Vec<String>> = roster
            .sorted(role)
            .into_iter()
            .map(|entry| {
                let mut cells = vec![entry.display_name.clone(), entry.display_email().to_string()];
                if let Some(index) = membership {
                    cells.push(index.groups_label(&entry.account_id));
                }
                cells
            })
            .collect();
        let rows: Vec<Vec<&str>> = cells
            .iter()
            .map(|row| row.iter().map(String::as_str).collect())
            .collect();

        table.section(role.title(), rows.first().map(Vec::as_slice));
        for row in &rows {
            table.row(row);
        }
        table.gap();
    }
    Ok(table.finish())
}

/// A rendered report ready to be written and attached.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub pages: usize,
    pub substitutions: usize,
}

pub fn render_roster_pdf(
    roster: &Roster,
    membership: Option<&GroupMembership>,
    title: &str,
) -> Result<RenderedReport, RenderError> {
    let document = layout_roster(roster, membership)?;
    let bytes = pdf::to_pdf_bytes(&document, title);
    info!(
        pages = document.pages.len(),
        bytes = bytes.len(),
        substitutions = document.substitutions,
        "Rendered roster PDF"
    );
    Ok(RenderedReport {
        bytes,
        pages: document.pages.len(),
        substitutions: document.substitutions,
    })
}
