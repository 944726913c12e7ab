//! Extraction of valuation rows from the rendered results grid.

use crate::error::HarvestError;
use crate::portal::models::RawRecord;
use crate::portal::selectors::results;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

/// Column count of the results grid: description, street address,
/// extent, market value.
const RESULT_COLUMNS: usize = 4;

/// Outcome of one page extraction. Rows that could not be read are kept
/// alongside the good ones so a bad row never costs its neighbours.
#[derive(Debug, Default)]
pub struct ExtractedRows {
    pub records: Vec<RawRecord>,
    pub skipped: Vec<HarvestError>,
}

impl ExtractedRows {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.skipped.is_empty()
    }
}

/// Parses results pages into raw records.
pub struct ResultsParser;

impl ResultsParser {
    /// Pulls every data row out of the results grid.
    ///
    /// A page with no grid is a legitimate empty result, not an error;
    /// volumes with no holdings of a given type render exactly that.
    /// Header rows are recognized by their `th` cells. A data row with
    /// the wrong cell count is recorded in `skipped` and extraction
    /// moves on to the next row.
    pub fn extract(html: &str) -> ExtractedRows {
        let document = Html::parse_document(html);

        let Some(table) = document.select(&results::TABLE).next() else {
            debug!("no results grid on page; treating as empty result set");
            return ExtractedRows::default();
        };

        let mut extracted = ExtractedRows::default();
        let mut data_row = 0usize;

        for row in table.select(&results::ROW) {
            // The grid's pager sits in a nested table; its rows belong
            // to that table, not to the grid.
            if !is_own_row(table, row) {
                continue;
            }
            if row.select(&results::HEADER_CELL).next().is_some() {
                continue;
            }
            if row.select(&results::NESTED_TABLE).next().is_some() {
                debug!("skipping pager row");
                continue;
            }
            data_row += 1;

            let cells: Vec<String> =
                row.select(&results::CELL).map(|cell| cell.text().collect()).collect();

            if cells.len() != RESULT_COLUMNS {
                let reason =
                    format!("expected {} cells, found {}", RESULT_COLUMNS, cells.len());
                warn!(row = data_row, %reason, "skipping unreadable results row");
                extracted.skipped.push(HarvestError::Parse { row: data_row, reason });
                continue;
            }

            let mut cells = cells.into_iter();
            extracted.records.push(RawRecord {
                description: cells.next().unwrap_or_default(),
                street_address: cells.next().unwrap_or_default(),
                extent: cells.next().unwrap_or_default(),
                market_value: cells.next().unwrap_or_default(),
            });
        }

        debug!(
            records = extracted.records.len(),
            skipped = extracted.skipped.len(),
            "results page extracted"
        );
        extracted
    }
}

/// True when the row's nearest enclosing table is the grid itself.
fn is_own_row(table: ElementRef<'_>, row: ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "table")
        .map(|parent| parent.id() == table.id())
        .unwrap_or(false)
}
