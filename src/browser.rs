//! Paginated, searchable view over an in-memory record collection.
//!
//! The browser never mutates records. It keeps the view state (search term,
//! column visibility, page window, row cursor, open dialog) and derives the
//! visible page from it on demand.

use rayon::prelude::*;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::record::{Collection, Column, Record};

pub const PAGE_SIZES: [usize; 4] = [5, 10, 20, 50];
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Failed(String),
    Ready,
}

/// Which columns are rendered. Starts with every column of the collection visible.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnVisibility {
    columns: Vec<(Column, bool)>,
}

impl ColumnVisibility {
    pub fn for_collection(collection: Collection) -> Self {
        ColumnVisibility {
            columns: collection.columns().iter().map(|&c| (c, true)).collect(),
        }
    }

    /// Flips a column. Returns false if the column is not part of this set.
    pub fn toggle(&mut self, column: Column) -> bool {
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some((_, visible)) => {
                *visible = !*visible;
                true
            }
            None => false,
        }
    }

    pub fn is_visible(&self, column: Column) -> bool {
        self.columns.iter().any(|&(c, v)| c == column && v)
    }

    pub fn visible(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().filter(|(_, v)| *v).map(|(c, _)| *c)
    }

    pub fn entries(&self) -> &[(Column, bool)] {
        &self.columns
    }
}

/// 1-based page index and the number of records per page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageWindow {
    pub index: usize,
    pub size: usize,
}

impl PageWindow {
    fn offset(&self) -> usize {
        (self.index - 1) * self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DialogKind {
    View,
    Edit,
    Delete,
}

/// The record an open dialog is about.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub record: Record,
}

pub struct RecordBrowser {
    collection: Collection,
    records: Arc<Vec<Record>>,
    rows: Arc<Vec<usize>>, // Mapping of filtered row index to record index
    search_term: String,
    visibility: ColumnVisibility,
    page: PageWindow,
    cursor: usize, // Row within the current page
    load: LoadState,
    dialog: Option<Dialog>,
}

impl RecordBrowser {
    pub fn new(collection: Collection, page_size: usize) -> Self {
        let size = if PAGE_SIZES.contains(&page_size) {
            page_size
        } else {
            DEFAULT_PAGE_SIZE
        };
        RecordBrowser {
            collection,
            records: Arc::new(Vec::new()),
            rows: Arc::new(Vec::new()),
            search_term: String::new(),
            visibility: ColumnVisibility::for_collection(collection),
            page: PageWindow { index: 1, size },
            cursor: 0,
            load: LoadState::Loading,
            dialog: None,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn visibility(&self) -> &ColumnVisibility {
        &self.visibility
    }

    pub fn page(&self) -> PageWindow {
        self.page
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    // -------------------- Input contract ---------------------- //

    pub fn begin_loading(&mut self) {
        self.load = LoadState::Loading;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.load = LoadState::Failed(message.into());
    }

    /// Installs a freshly fetched collection. The page index is clamped so a
    /// shrinking collection never leaves the view on a blank page.
    pub fn replace_records(&mut self, records: Vec<Record>) {
        self.records = Arc::new(records);
        self.load = LoadState::Ready;
        self.refilter();
        let last = self.total_pages().max(1);
        if self.page.index > last {
            trace!("Clamping page {} to {}", self.page.index, last);
            self.page.index = last;
        }
        self.clamp_cursor();
    }

    // -------------------- Operations ---------------------- //

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_string();
        self.page.index = 1;
        self.cursor = 0;
        self.refilter();
    }

    pub fn toggle_column(&mut self, column: Column) -> bool {
        let toggled = self.visibility.toggle(column);
        if !toggled {
            trace!("Ignoring toggle of {:?} for {}", column, self.collection.label());
        }
        toggled
    }

    pub fn toggle_column_named(&mut self, name: &str) -> bool {
        match name.parse::<Column>() {
            Ok(column) => self.toggle_column(column),
            Err(_) => {
                trace!("Ignoring toggle of unknown column \"{name}\"");
                false
            }
        }
    }

    /// Only the sizes offered by the footer are accepted; anything else is ignored.
    pub fn set_page_size(&mut self, size: usize) -> bool {
        if !PAGE_SIZES.contains(&size) {
            warn!("Ignoring page size {size}, allowed sizes are {PAGE_SIZES:?}");
            return false;
        }
        self.page = PageWindow { index: 1, size };
        self.cursor = 0;
        true
    }

    pub fn cycle_page_size(&mut self) {
        let pos = PAGE_SIZES.iter().position(|&s| s == self.page.size).unwrap_or(0);
        self.set_page_size(PAGE_SIZES[(pos + 1) % PAGE_SIZES.len()]);
    }

    /// Moves by `delta` pages, stopping at the first and last page.
    pub fn go_to_page(&mut self, delta: isize) {
        let last = self.total_pages().max(1);
        let target = (self.page.index as isize + delta).clamp(1, last as isize) as usize;
        if target != self.page.index {
            self.page.index = target;
            self.cursor = 0;
        }
    }

    pub fn next_page(&mut self) {
        if self.can_go_next() {
            self.go_to_page(1);
        }
    }

    pub fn previous_page(&mut self) {
        if self.can_go_previous() {
            self.go_to_page(-1);
        }
    }

    pub fn can_go_previous(&self) -> bool {
        self.page.index > 1
    }

    pub fn can_go_next(&self) -> bool {
        let total = self.total_pages();
        total > 0 && self.page.index < total
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let count = self.visible_record_count();
        if count == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = (self.cursor as isize + delta).clamp(0, count as isize - 1) as usize;
    }

    pub fn selected(&self) -> Option<&Record> {
        self.page_slice().into_iter().nth(self.cursor)
    }

    pub fn request_view(&mut self, record: Record) {
        self.open_dialog(DialogKind::View, record);
    }

    pub fn request_edit(&mut self, record: Record) {
        self.open_dialog(DialogKind::Edit, record);
    }

    pub fn request_delete(&mut self, record: Record) {
        self.open_dialog(DialogKind::Delete, record);
    }

    pub fn close_dialog(&mut self) -> Option<Dialog> {
        self.dialog.take()
    }

    fn open_dialog(&mut self, kind: DialogKind, record: Record) {
        trace!("Open {:?} dialog for record {}", kind, record.id());
        self.dialog = Some(Dialog { kind, record });
    }

    // -------------------- Derived state ---------------------- //

    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    pub fn filtered_len(&self) -> usize {
        self.rows.len()
    }

    pub fn total_pages(&self) -> usize {
        self.filtered_len().div_ceil(self.page.size)
    }

    pub fn visible_record_count(&self) -> usize {
        self.filtered_len()
            .saturating_sub(self.page.offset())
            .min(self.page.size)
    }

    pub fn page_slice(&self) -> Vec<&Record> {
        let rbegin = std::cmp::min(self.page.offset(), self.rows.len());
        let rend = std::cmp::min(rbegin + self.page.size, self.rows.len());
        self.rows[rbegin..rend]
            .iter()
            .map(|&ridx| &self.records[ridx])
            .collect()
    }

    fn refilter(&mut self) {
        self.rows = Arc::new(Self::filter_rows(&self.records, &self.search_term));
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        self.cursor = std::cmp::min(self.cursor, self.visible_record_count().saturating_sub(1));
    }

    // Return indices of records whose title contains the term, ignoring case
    fn filter_rows(records: &[Record], term: &str) -> Vec<usize> {
        let needle = term.to_lowercase();
        if needle.is_empty() {
            return (0..records.len()).collect();
        }
        records
            .par_iter()
            .enumerate()
            .filter(|(_, r)| r.title().to_lowercase().contains(&needle))
            .map(|(idx, _)| idx)
            .collect()
    }
}
