//! Drives the portal's stateful search form to a results page.
//!
//! The portal renders one results page only after a fixed conversation:
//! load the search page, post back the property type (which populates the
//! volume list server-side), then submit the search with a volume chosen.
//! Each step must echo the hidden state of the page before it, so the
//! steps are modeled as an explicit state machine where every state owns
//! exactly the data the next transition needs.

use crate::error::{HarvestError, SelectControl};
use crate::portal::client::PortalHttp;
use crate::portal::forms::FormFields;
use crate::portal::models::SearchCombination;
use crate::portal::selectors::search;
use scraper::{ElementRef, Html};
use tracing::debug;

/// Where the navigator stands in the postback conversation.
///
/// States carry owned payloads rather than parsed documents so the
/// futures stay `Send`; parsing happens in the synchronous transitions.
pub enum NavState {
    /// Nothing requested yet.
    LoadSearchPage,
    /// Landing page parsed; ready to post the property-type change.
    SubmitPropertyType { payload: Vec<(String, String)> },
    /// Property type accepted; the page now lists volumes.
    SelectVolume { html: String },
    /// Volume chosen; ready to post the search itself.
    SubmitSearch { payload: Vec<(String, String)> },
    /// The results page, as served.
    ResultsReady { html: String },
}

impl NavState {
    /// Step name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            NavState::LoadSearchPage => "load-search-page",
            NavState::SubmitPropertyType { .. } => "submit-property-type",
            NavState::SelectVolume { .. } => "select-volume",
            NavState::SubmitSearch { .. } => "submit-search",
            NavState::ResultsReady { .. } => "results-ready",
        }
    }
}

/// Walks one combination through the form to its results page.
pub struct FormNavigator<'a, H: PortalHttp> {
    http: &'a H,
    base_url: &'a str,
    combination: &'a SearchCombination,
}

impl<'a, H: PortalHttp> FormNavigator<'a, H> {
    pub fn new(http: &'a H, base_url: &'a str, combination: &'a SearchCombination) -> Self {
        Self { http, base_url, combination }
    }

    /// Runs the conversation start to finish and returns the results page.
    ///
    /// Any failed transition aborts the whole combination; there is no
    /// rewinding to an earlier step, because the server-side state a
    /// partial conversation leaves behind cannot be trusted.
    pub async fn results_page(&self) -> Result<String, HarvestError> {
        let mut state = NavState::LoadSearchPage;
        loop {
            debug!(step = state.name(), combination = %self.combination, "advancing search form");
            match self.advance(state).await? {
                NavState::ResultsReady { html } => return Ok(html),
                next => state = next,
            }
        }
    }

    /// Performs one transition.
    async fn advance(&self, state: NavState) -> Result<NavState, HarvestError> {
        match state {
            NavState::LoadSearchPage => {
                let html = self.http.get(self.base_url).await?;
                let payload = build_type_postback(&html, &self.combination.property_type)?;
                Ok(NavState::SubmitPropertyType { payload })
            }
            NavState::SubmitPropertyType { payload } => {
                let html = self.http.post_form(self.base_url, &payload).await?;
                Ok(NavState::SelectVolume { html })
            }
            NavState::SelectVolume { html } => {
                let payload = build_search_submit(&html, &self.combination.volume_no)?;
                Ok(NavState::SubmitSearch { payload })
            }
            NavState::SubmitSearch { payload } => {
                let html = self.http.post_form(self.base_url, &payload).await?;
                Ok(NavState::ResultsReady { html })
            }
            done @ NavState::ResultsReady { .. } => Ok(done),
        }
    }
}

/// Builds the payload that changes the property-type dropdown, the way
/// the page's own `__doPostBack` handler would.
fn build_type_postback(html: &str, property_type: &str) -> Result<Vec<(String, String)>, HarvestError> {
    let document = Html::parse_document(html);

    let select = document
        .select(&search::PROPERTY_TYPE)
        .next()
        .ok_or_else(|| HarvestError::ElementNotFound("property type selector".into()))?;
    let name = select
        .value()
        .attr("name")
        .ok_or_else(|| HarvestError::ElementNotFound("property type selector name".into()))?
        .to_string();

    let value = option_value(select, property_type).ok_or_else(|| HarvestError::OptionNotFound {
        control: SelectControl::PropertyType,
        option: property_type.to_string(),
    })?;

    let mut fields = FormFields::from_document(&document)?;
    fields.set(&name, &value);
    Ok(fields.into_postback(&name))
}

/// Builds the search submission: volume chosen, search button pressed.
fn build_search_submit(html: &str, volume_no: &str) -> Result<Vec<(String, String)>, HarvestError> {
    let document = Html::parse_document(html);

    let select = document
        .select(&search::VOLUME)
        .next()
        .ok_or_else(|| HarvestError::ElementNotFound("volume selector".into()))?;
    let name = select
        .value()
        .attr("name")
        .ok_or_else(|| HarvestError::ElementNotFound("volume selector name".into()))?
        .to_string();

    let value = option_value(select, volume_no).ok_or_else(|| HarvestError::OptionNotFound {
        control: SelectControl::Volume,
        option: volume_no.to_string(),
    })?;

    let button = document
        .select(&search::SEARCH_BUTTON)
        .next()
        .ok_or_else(|| HarvestError::ElementNotFound("search button".into()))?;
    let button_name = button
        .value()
        .attr("name")
        .ok_or_else(|| HarvestError::ElementNotFound("search button name".into()))?
        .to_string();
    let button_value = button.value().attr("value").unwrap_or("Search").to_string();

    let mut fields = FormFields::from_document(&document)?;
    fields.set(&name, &value);
    Ok(fields.into_submit(&button_name, &button_value))
}

/// Finds the option whose visible text matches `wanted` exactly (after
/// trimming) and returns the value the browser would post for it.
fn option_value(select: ElementRef<'_>, wanted: &str) -> Option<String> {
    for option in select.select(&search::OPTION) {
        let text = option.text().collect::<String>();
        if text.trim() == wanted {
            return Some(
                option
                    .value()
                    .attr("value")
                    .map(str::to_string)
                    .unwrap_or_else(|| text.trim().to_string()),
            );
        }
    }
    None
}
