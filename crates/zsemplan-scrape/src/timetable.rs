//! Weekly lesson grid reconstruction.
//!
//! ```text
//!          col 0   col 1    col 2 ...
//! row 0    Nr      Godz     1A     ← header row, dropped
//! row 1    1       8:00     Mat    ← time label from the time cell
//! row 2    2       8:55     Ang|Ang (two linked spans = two subgroups)
//!          └ structural ┘   └ class-group columns kept ┘
//! ```
//!
//! Rows are collected into an explicit grid, the header row is dropped, ragged
//! rows are padded, and only then is the grid transposed into columns.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Selector};
use zsemplan_core::config::LayoutConfig;
use zsemplan_core::{
    Cell, LessonEntry, Reference, Result, TimeSlot, TimetableColumn, TimetableEntry,
    TimetableSnapshot,
};

use crate::document::{
    Document, cells_of, compile, find_table, href_of, linked_spans_of, rows_of, text_of,
};

/// Row-number and time-label columns; never class-groups.
pub const STRUCTURAL_COLUMNS: usize = 2;

/// Compiled selectors for the timetable page.
pub struct TimetableGridBuilder {
    table: Selector,
    time_cell: Selector,
    lesson_name: Selector,
    teacher_link: Selector,
    room_link: Selector,
}

impl TimetableGridBuilder {
    pub fn new(layout: &LayoutConfig) -> Result<Self> {
        Ok(Self {
            table: compile(&layout.timetable_table)?,
            time_cell: compile(&layout.time_cell)?,
            lesson_name: compile(&layout.lesson_name)?,
            teacher_link: compile(&layout.teacher_link)?,
            room_link: compile(&layout.room_link)?,
        })
    }

    /// Build the snapshot. A page without the timetable table yields an empty one.
    pub fn build(&self, doc: &Document, captured_at: DateTime<Utc>) -> TimetableSnapshot {
        let mut grid = Grid::default();
        match find_table(doc, &self.table) {
            Some(table) => {
                for row in rows_of(table) {
                    let cells = cells_of(row).into_iter().map(|cell| self.cell(cell)).collect();
                    grid.push_row(TimeSlot::new(text_of(row, &self.time_cell)), cells);
                }
            }
            None => tracing::warn!("⚠️ Timetable table not found; writing an empty timetable"),
        }

        let (times, columns) = grid.into_columns();
        TimetableSnapshot {
            times,
            columns,
            captured_at,
        }
    }

    fn cell(&self, cell: ElementRef<'_>) -> Cell {
        let subgroups = linked_spans_of(cell);
        if subgroups.is_empty() {
            vec![self.entry(cell)]
        } else {
            subgroups.into_iter().map(|span| self.entry(span)).collect()
        }
    }

    fn entry(&self, scope: ElementRef<'_>) -> LessonEntry {
        LessonEntry {
            name: text_of(scope, &self.lesson_name),
            teacher: Reference::new(
                href_of(scope, &self.teacher_link),
                text_of(scope, &self.teacher_link),
            ),
            room: Reference::new(href_of(scope, &self.room_link), text_of(scope, &self.room_link)),
        }
    }
}

/// Rows of cells keyed by `(row, column)`, with one time label per row.
#[derive(Default)]
struct Grid {
    times: Vec<TimeSlot>,
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    fn push_row(&mut self, time: TimeSlot, cells: Vec<Cell>) {
        self.times.push(time);
        self.rows.push(cells);
    }

    /// Drop the header row, pad to a rectangle, transpose, drop structural columns.
    fn into_columns(mut self) -> (Vec<TimeSlot>, Vec<TimetableColumn>) {
        if self.rows.is_empty() {
            return (Vec::new(), Vec::new());
        }
        self.times.remove(0);
        self.rows.remove(0);

        let width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        for (index, row) in self.rows.iter_mut().enumerate() {
            if row.len() < width {
                tracing::warn!(
                    "⚠️ Timetable row {} has {} of {} cells; padding with empty lessons",
                    index + 1,
                    row.len(),
                    width
                );
                row.resize_with(width, || vec![LessonEntry::default()]);
            }
        }

        let mut columns: Vec<TimetableColumn> = (0..width)
            .map(|_| TimetableColumn {
                entries: Vec::with_capacity(self.times.len()),
            })
            .collect();
        for (time, row) in self.times.iter().zip(self.rows) {
            for (column, lessons) in columns.iter_mut().zip(row) {
                column.entries.push(TimetableEntry {
                    time: time.clone(),
                    lessons,
                });
            }
        }

        let columns = columns.into_iter().skip(STRUCTURAL_COLUMNS).collect();
        (self.times, columns)
    }
}
