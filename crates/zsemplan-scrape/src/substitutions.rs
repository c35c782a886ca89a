//! One day's substitution table.

use zsemplan_core::SubstitutionRecord;

use crate::document::{Document, cells_of, own_text, rows_of};

/// Both leading rows of the table are headers.
pub const HEADER_ROWS: usize = 2;

/// Parse the first table of a substitution page.
///
/// Cells map onto record fields by position; rows shorter than
/// [`SubstitutionRecord::FIELDS`] leave the trailing fields empty. A page with
/// no table has no substitutions.
pub fn parse_substitutions(doc: &Document) -> Vec<SubstitutionRecord> {
    let Some(table) = doc.first_table() else {
        tracing::warn!("⚠️ Substitution page has no table");
        return Vec::new();
    };

    rows_of(table)
        .into_iter()
        .skip(HEADER_ROWS)
        .map(|row| {
            let cells = cells_of(row)
                .into_iter()
                .take(SubstitutionRecord::FIELDS)
                .map(own_text);
            SubstitutionRecord::from_cells(cells)
        })
        .collect()
}
