//! Integration tests driving the real HTTP client and navigator against
//! a mock portal, postback protocol and all.

use valuation_harvester::config::PortalConfig;
use valuation_harvester::error::{HarvestError, SelectControl};
use valuation_harvester::portal::{CombinationScraper, PortalClient, PortalScraper, SearchCombination};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn landing_page() -> String {
    r#"<!DOCTYPE html>
    <html><body>
    <form method="post" action="./" id="aspnetForm">
        <input type="hidden" name="__VIEWSTATE" value="LANDING-STATE" />
        <input type="hidden" name="__EVENTVALIDATION" value="LANDING-VALID" />
        <select name="ctl00$ContentPlaceHolder1$ddlPropertyType" id="ctl00_ContentPlaceHolder1_ddlPropertyType">
            <option value="">-- Select Property Type --</option>
            <option value="Full Title Property">Full Title Property</option>
            <option value="Sectional Title Property">Sectional Title Property</option>
        </select>
    </form>
    </body></html>"#
        .to_string()
}

fn volume_page() -> String {
    r#"<!DOCTYPE html>
    <html><body>
    <form method="post" action="./" id="aspnetForm">
        <input type="hidden" name="__VIEWSTATE" value="VOLUME-STATE" />
        <input type="hidden" name="__EVENTVALIDATION" value="VOLUME-VALID" />
        <select name="ctl00$ContentPlaceHolder1$ddlPropertyType">
            <option value="">-- Select Property Type --</option>
            <option selected="selected" value="Full Title Property">Full Title Property</option>
            <option value="Sectional Title Property">Sectional Title Property</option>
        </select>
        <select name="ctl00$ContentPlaceHolder1$ddlVolume" id="ctl00_ContentPlaceHolder1_ddlVolume">
            <option value="1">1</option>
            <option value="2">2</option>
            <option value="3">3</option>
        </select>
        <input type="submit" name="ctl00$ContentPlaceHolder1$btnSearch" value="Search" />
    </form>
    </body></html>"#
        .to_string()
}

fn results_page() -> String {
    r#"<!DOCTYPE html>
    <html><body>
    <form method="post" action="./" id="aspnetForm">
        <input type="hidden" name="__VIEWSTATE" value="RESULTS-STATE" />
        <table id="ctl00_ContentPlaceHolder1_gvResults">
            <tr><th>Property Description</th><th>Street Address</th><th>Extent</th><th>Market Value</th></tr>
            <tr><td>ERF 100 OF DURBAN</td><td>1 SMITH STREET</td><td>450.00</td><td>R 1,200,000</td></tr>
            <tr><td>ERF 101 OF DURBAN</td><td>3 SMITH STREET</td><td>460.00</td><td>R 1,250,000</td></tr>
        </table>
    </form>
    </body></html>"#
        .to_string()
}

fn empty_results_page() -> String {
    r#"<html><body><form id="aspnetForm">
        <input type="hidden" name="__VIEWSTATE" value="RESULTS-STATE" />
        <p>No properties matched your search.</p>
    </form></body></html>"#
        .to_string()
}

fn test_config() -> PortalConfig {
    PortalConfig {
        request_timeout_secs: 5,
        max_retries: 3,
        retry_backoff_ms: 1,
        ..PortalConfig::default()
    }
}

fn scraper_for(server: &MockServer) -> PortalScraper<PortalClient> {
    let client = PortalClient::new(&test_config()).unwrap();
    PortalScraper::with_http(client, server.uri())
}

/// Mounts the full three-step conversation, ending on `final_page`.
async fn mount_conversation(server: &MockServer, final_page: String) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page()))
        .mount(server)
        .await;

    // The type change posts back through the dropdown and must echo the
    // landing page's hidden state.
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("__EVENTTARGET=ctl00%24ContentPlaceHolder1%24ddlPropertyType"))
        .and(body_string_contains("__VIEWSTATE=LANDING-STATE"))
        .respond_with(ResponseTemplate::new(200).set_body_string(volume_page()))
        .mount(server)
        .await;

    // The search submit names the button and echoes the second page's
    // state.
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("ctl00%24ContentPlaceHolder1%24btnSearch=Search"))
        .and(body_string_contains("__VIEWSTATE=VOLUME-STATE"))
        .respond_with(ResponseTemplate::new(200).set_body_string(final_page))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_scrape_walks_the_postback_conversation() {
    let server = MockServer::start().await;
    mount_conversation(&server, results_page()).await;

    let scraper = scraper_for(&server);
    let combination = SearchCombination::new("Full Title Property", "2");

    let records = scraper.scrape(&combination).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].description, "ERF 100 OF DURBAN");
    assert_eq!(records[1].market_value, "R 1,250,000");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_scrape_retries_transient_landing_failures() {
    let server = MockServer::start().await;

    // Two 503s before the landing page appears; the GET retry absorbs
    // them and the conversation completes.
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_conversation(&server, results_page()).await;

    let scraper = scraper_for(&server);
    let combination = SearchCombination::new("Full Title Property", "2");

    let records = scraper.scrape(&combination).await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_scrape_of_empty_volume_returns_no_records() {
    let server = MockServer::start().await;
    mount_conversation(&server, empty_results_page()).await;

    let scraper = scraper_for(&server);
    let combination = SearchCombination::new("Full Title Property", "1");

    let records = scraper.scrape(&combination).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_absent_volume_stops_before_the_search_post() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("__EVENTTARGET=ctl00%24ContentPlaceHolder1%24ddlPropertyType"))
        .respond_with(ResponseTemplate::new(200).set_body_string(volume_page()))
        .mount(&server)
        .await;
    // The portal lists volumes 1 to 3; no search may be submitted for 77.
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("btnSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page()))
        .expect(0)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let combination = SearchCombination::new("Full Title Property", "77");

    let err = scraper.scrape(&combination).await.unwrap_err();
    assert!(matches!(
        err,
        HarvestError::OptionNotFound { control: SelectControl::Volume, .. }
    ));
}

#[tokio::test]
async fn test_failed_postback_is_never_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page()))
        .mount(&server)
        .await;
    // A postback that dies must abort the combination: replaying it
    // against re-wound server state would lie about the form.
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = scraper_for(&server);
    let combination = SearchCombination::new("Full Title Property", "1");

    let err = scraper.scrape(&combination).await.unwrap_err();
    assert!(matches!(err, HarvestError::Network(_)));
    assert!(err.to_string().contains("500"));
}
