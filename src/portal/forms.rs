//! Hidden-state handling for the portal's postback protocol.
//!
//! Every page the portal renders carries the server-side form state in
//! hidden inputs (`__VIEWSTATE`, `__EVENTVALIDATION`); a request is only
//! valid if it posts those values back exactly as rendered. This module
//! harvests that state from a page and assembles the payload for the next
//! postback.

use crate::error::HarvestError;
use crate::portal::selectors::form;
use scraper::Html;

/// Name/value pairs harvested from a rendered form, in document order.
#[derive(Debug, Clone, Default)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    /// Collects every named field that would accompany a browser postback.
    ///
    /// Submit-style inputs are left out; the trigger control is named
    /// explicitly when the payload is built. Unchecked radio and checkbox
    /// inputs do not post. Selects contribute their selected option (or
    /// the first option, which is what a browser would submit untouched).
    ///
    /// Fails with `ElementNotFound` if the page carries no `__VIEWSTATE`,
    /// which means this is not the portal's form at all.
    pub fn from_document(document: &Html) -> Result<Self, HarvestError> {
        let mut fields = Vec::new();

        for input in document.select(&form::INPUT) {
            let element = input.value();
            let Some(name) = element.attr("name") else { continue };

            let input_type = element.attr("type").unwrap_or("text").to_ascii_lowercase();
            match input_type.as_str() {
                "submit" | "image" | "button" | "reset" => continue,
                "radio" | "checkbox" if element.attr("checked").is_none() => continue,
                _ => {}
            }

            fields.push((name.to_string(), element.attr("value").unwrap_or("").to_string()));
        }

        for select in document.select(&form::SELECT) {
            let Some(name) = select.value().attr("name") else { continue };
            let value = selected_option_value(select);
            fields.push((name.to_string(), value));
        }

        if !fields.iter().any(|(name, _)| name == "__VIEWSTATE") {
            return Err(HarvestError::ElementNotFound("__VIEWSTATE".into()));
        }

        Ok(Self(fields))
    }

    /// Returns the current value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(field, _)| field == name).map(|(_, value)| value.as_str())
    }

    /// Replaces the value for `name`, appending the pair if absent.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.0.iter_mut().find(|(field, _)| field == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.0.push((name.to_string(), value.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Payload for a postback fired by a change event on `event_target`,
    /// filled in the way the portal's own `__doPostBack` script would.
    pub fn into_postback(mut self, event_target: &str) -> Vec<(String, String)> {
        self.set("__EVENTTARGET", event_target);
        self.set("__EVENTARGUMENT", "");
        self.0
    }

    /// Payload for a submit-button post: the button contributes its own
    /// name/value pair and the event target stays empty.
    pub fn into_submit(mut self, button_name: &str, button_value: &str) -> Vec<(String, String)> {
        self.set("__EVENTTARGET", "");
        self.set("__EVENTARGUMENT", "");
        self.set(button_name, button_value);
        self.0
    }
}

/// The value a browser would post for a select: the selected option's
/// value attribute, falling back to its text, falling back to the first
/// option when nothing is marked selected.
fn selected_option_value(select: scraper::ElementRef<'_>) -> String {
    let mut first = None;
    for option in select.select(&crate::portal::selectors::search::OPTION) {
        let value = option
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| option.text().collect::<String>().trim().to_string());
        if option.value().attr("selected").is_some() {
            return value;
        }
        if first.is_none() {
            first = Some(value);
        }
    }
    first.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> Html {
        Html::parse_document(&format!("<html><body><form>{}</form></body></html>", body))
    }

    const HIDDEN_STATE: &str = concat!(
        r#"<input type="hidden" name="__VIEWSTATE" value="dDwtMTI3OTMz">"#,
        r#"<input type="hidden" name="__EVENTVALIDATION" value="wEWAgL3">"#,
    );

    #[test]
    fn test_harvest_hidden_fields() {
        let document = page(HIDDEN_STATE);
        let fields = FormFields::from_document(&document).unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("__VIEWSTATE"), Some("dDwtMTI3OTMz"));
        assert_eq!(fields.get("__EVENTVALIDATION"), Some("wEWAgL3"));
    }

    #[test]
    fn test_missing_viewstate_is_not_a_form() {
        let document = page(r#"<input type="text" name="query" value="x">"#);
        let err = FormFields::from_document(&document).unwrap_err();
        assert!(matches!(err, HarvestError::ElementNotFound(_)));
        assert!(err.to_string().contains("__VIEWSTATE"));
    }

    #[test]
    fn test_submit_inputs_do_not_post() {
        let document = page(&format!(
            "{}{}",
            HIDDEN_STATE,
            concat!(
                r#"<input type="submit" name="btnSearch" value="Search">"#,
                r#"<input type="image" name="imgGo" src="go.gif">"#,
                r#"<input type="button" name="btnClear" value="Clear">"#,
            )
        ));
        let fields = FormFields::from_document(&document).unwrap();

        assert!(fields.get("btnSearch").is_none());
        assert!(fields.get("imgGo").is_none());
        assert!(fields.get("btnClear").is_none());
    }

    #[test]
    fn test_only_checked_toggles_post() {
        let document = page(&format!(
            "{}{}",
            HIDDEN_STATE,
            concat!(
                r#"<input type="checkbox" name="chkExact" value="on" checked>"#,
                r#"<input type="checkbox" name="chkArchived" value="on">"#,
                r#"<input type="radio" name="rblScope" value="all">"#,
                r#"<input type="radio" name="rblScope" value="active" checked>"#,
            )
        ));
        let fields = FormFields::from_document(&document).unwrap();

        assert_eq!(fields.get("chkExact"), Some("on"));
        assert!(fields.get("chkArchived").is_none());
        assert_eq!(fields.get("rblScope"), Some("active"));
    }

    #[test]
    fn test_selects_post_their_selection() {
        let document = page(&format!(
            "{}{}",
            HIDDEN_STATE,
            concat!(
                r#"<select name="ddlPropertyType">"#,
                r#"<option value="">-- Select --</option>"#,
                r#"<option value="FT" selected>Full Title Property</option>"#,
                r#"</select>"#,
                r#"<select name="ddlVolume"><option>1</option><option>2</option></select>"#,
            )
        ));
        let fields = FormFields::from_document(&document).unwrap();

        assert_eq!(fields.get("ddlPropertyType"), Some("FT"));
        // No selection marked: the browser would submit the first option.
        assert_eq!(fields.get("ddlVolume"), Some("1"));
    }

    #[test]
    fn test_set_overwrites_or_appends() {
        let document = page(HIDDEN_STATE);
        let mut fields = FormFields::from_document(&document).unwrap();

        fields.set("__VIEWSTATE", "replaced");
        assert_eq!(fields.get("__VIEWSTATE"), Some("replaced"));
        assert_eq!(fields.len(), 2);

        fields.set("ddlVolume", "17");
        assert_eq!(fields.get("ddlVolume"), Some("17"));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_postback_payload_sets_event_target() {
        let document = page(HIDDEN_STATE);
        let fields = FormFields::from_document(&document).unwrap();

        let payload = fields.into_postback("ctl00$Main$ddlPropertyType");
        let target = payload.iter().find(|(name, _)| name == "__EVENTTARGET").unwrap();
        assert_eq!(target.1, "ctl00$Main$ddlPropertyType");

        let argument = payload.iter().find(|(name, _)| name == "__EVENTARGUMENT").unwrap();
        assert_eq!(argument.1, "");

        // Hidden state rides along untouched.
        assert!(payload.iter().any(|(name, value)| name == "__VIEWSTATE" && value == "dDwtMTI3OTMz"));
    }

    #[test]
    fn test_submit_payload_names_the_button() {
        let document = page(HIDDEN_STATE);
        let fields = FormFields::from_document(&document).unwrap();

        let payload = fields.into_submit("ctl00$Main$btnSearch", "Search");
        assert!(payload.iter().any(|(name, value)| name == "ctl00$Main$btnSearch" && value == "Search"));

        let target = payload.iter().find(|(name, _)| name == "__EVENTTARGET").unwrap();
        assert_eq!(target.1, "");
    }
}
