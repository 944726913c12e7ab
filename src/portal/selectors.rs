//! CSS selectors for the portal's WebForms pages.
//!
//! Every selector used to locate a control or the results grid lives here.
//! The portal names its controls the classic WebForms way, with container
//! prefixes in front of the control id ("ctl00$Main$ddlPropertyType"), so
//! all control selectors match by suffix. Update this file when the portal
//! changes its markup.

use scraper::Selector;
use std::sync::LazyLock;

/// Selectors for the search form pages.
pub mod search {
    use super::*;

    /// Property-type dropdown on the landing page.
    pub static PROPERTY_TYPE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "select[name$='ddlPropertyType'], \
             select[id$='ddlPropertyType']",
        )
        .unwrap()
    });

    /// Volume dropdown, present once a property type has posted back.
    pub static VOLUME: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "select[name$='ddlVolume'], \
             select[id$='ddlVolume']",
        )
        .unwrap()
    });

    /// Search trigger button.
    pub static SEARCH_BUTTON: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "input[name$='btnSearch'], \
             input[id$='btnSearch']",
        )
        .unwrap()
    });

    /// Options inside a located select.
    pub static OPTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option").unwrap());
}

/// Selectors for the rendered results page.
pub mod results {
    use super::*;

    /// Results grid.
    pub static TABLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "table[id$='gvResults'], \
             table[id$='gvProperties']",
        )
        .unwrap()
    });

    /// All rows within the grid.
    pub static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

    /// Data cells.
    pub static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

    /// Header cells; a row containing these is never data.
    pub static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());

    /// A table inside a row marks the grid's pager shell.
    pub static NESTED_TABLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("table").unwrap());
}

/// Selectors for harvesting postback form state.
pub mod form {
    use super::*;

    /// Every input that might carry state into the next request.
    pub static INPUT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("input").unwrap());

    /// Select controls; the chosen option posts with the form.
    pub static SELECT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("select").unwrap());
}
