use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::config;
use crate::controller::{
    ControllerConfig, ControllerError, FilterController, FormEvent, ResponseDisposition,
    ResponsePolicy,
};
use crate::fetch::{
    FetchCompletion, FetchError, FetchRequest, HttpListingSource, HttpSourceOptions,
    ListingSource,
};
use crate::form::{FilterForm, FormControl};
use crate::format::Dimension;
use crate::page::{ElementIds, Page};
use crate::session::{Session, SessionCommand, SessionError};
use crate::slider::RangeBounds;

fn genres() -> Vec<String> {
    vec!["Action".to_string(), "RPG".to_string(), "Indie".to_string()]
}

fn sized_config() -> ControllerConfig {
    ControllerConfig {
        price: RangeBounds::new(0.0, 100.0, 19.6, 80.0),
        size: Some(RangeBounds::new(0.5, 120.0, 4.37, 60.0)),
        ..ControllerConfig::default()
    }
}

fn price_only() -> (FilterController, Vec<FetchRequest>) {
    let ids = ElementIds::default();
    FilterController::init(
        ControllerConfig::default(),
        Page::catalogue(&ids, &genres(), false),
    )
    .unwrap()
}

fn ok(seq: u64, html: &str) -> FetchCompletion {
    FetchCompletion {
        seq,
        result: Ok(html.to_string()),
    }
}

fn listing(controller: &FilterController) -> &str {
    controller.page().inner_html("games-list").unwrap()
}

#[test]
fn init_mirrors_sliders_and_writes_start_labels() {
    let ids = ElementIds::default();
    let (controller, requests) =
        FilterController::init(sized_config(), Page::catalogue(&ids, &genres(), true)).unwrap();

    let form = controller.page().form();
    assert_eq!(form.value_of("min-price"), Some("20"));
    assert_eq!(form.value_of("max-price"), Some("80"));
    assert_eq!(form.value_of("min-size"), Some("4.4"));
    assert_eq!(form.value_of("max-size"), Some("60"));

    assert_eq!(
        controller.page().text_content("price-range-label"),
        Some("$19.6 - $80")
    );
    assert_eq!(
        controller.page().text_content("size-range-label"),
        Some("4.37 GB - 60 GB")
    );

    assert_eq!(
        requests,
        vec![
            FetchRequest {
                seq: 0,
                query: "min_price=20&max_price=80".to_string(),
            },
            FetchRequest {
                seq: 1,
                query: "min_price=20&max_price=80&min_size=4.4&max_size=60".to_string(),
            },
        ]
    );
}

#[test]
fn slider_update_mirrors_rounded_values_into_hidden_inputs() {
    let (mut controller, _) = price_only();
    let outcome = controller.set_slider(Dimension::Price, 10.4, 55.2).unwrap();

    let form = controller.page().form();
    assert_eq!(form.value_of("min-price"), Some("10"));
    assert_eq!(form.value_of("max-price"), Some("55"));
    assert_eq!(
        controller.page().text_content("price-range-label"),
        Some("$10 - $55")
    );
    assert_eq!(
        outcome.request.unwrap().query,
        "min_price=10&max_price=55"
    );
}

#[test]
fn size_slider_hidden_values_have_no_unit() {
    let ids = ElementIds::default();
    let (mut controller, _) =
        FilterController::init(sized_config(), Page::catalogue(&ids, &[], true)).unwrap();
    controller.set_slider(Dimension::Size, 2.26, 10.0).unwrap();

    let form = controller.page().form();
    assert_eq!(form.value_of("min-size"), Some("2.3"));
    assert_eq!(form.value_of("max-size"), Some("10"));
    assert_eq!(
        controller.page().text_content("size-range-label"),
        Some("2.3 GB - 10 GB")
    );
}

#[test]
fn moving_a_missing_size_slider_is_an_error() {
    let (mut controller, _) = price_only();
    assert!(matches!(
        controller.set_slider(Dimension::Size, 1.0, 2.0),
        Err(ControllerError::NoSlider { .. })
    ));
}

#[test]
fn checked_genres_are_appended_in_document_order() {
    let (mut controller, _) = price_only();
    controller.set_checked("genre-rpg", true).unwrap();
    controller.set_checked("genre-action", true).unwrap();
    let outcome = controller.handle(FormEvent::Change {
        target: "genre-rpg".to_string(),
    });
    let query = outcome.request.unwrap().query;
    assert_eq!(query, "min_price=0&max_price=100&genres=Action&genres=RPG");
    assert!(!query.contains("title="));
}

#[test]
fn typing_issues_one_request_with_encoded_text() {
    let (mut controller, _) = price_only();
    controller.set_control_value("title", "half life").unwrap();
    let outcome = controller.handle(FormEvent::Input {
        target: "title".to_string(),
    });
    let request = outcome.request.unwrap();
    assert!(request.query.starts_with("title=half+life&"));
    assert_eq!(controller.stats().issued, 2);
}

#[test]
fn input_from_inside_a_slider_is_ignored() {
    let mut form = FilterForm::new("filter-form");
    form.push(FormControl::text("title", "title"));
    form.push(FormControl::text("price-handle", "").inside("price-slider"));
    form.push(FormControl::hidden("min-price", "min_price"));
    form.push(FormControl::hidden("max-price", "max_price"));
    let page = Page::new(form)
        .with_slider_container("price-slider")
        .with_label("price-range-label", "")
        .with_container("games-list", "");
    let (mut controller, _) = FilterController::init(ControllerConfig::default(), page).unwrap();

    for target in ["price-handle", "price-slider"] {
        let outcome = controller.handle(FormEvent::Input {
            target: target.to_string(),
        });
        assert!(outcome.request.is_none(), "{target} should not fetch");
    }
    let outcome = controller.handle(FormEvent::Input {
        target: "title".to_string(),
    });
    assert!(outcome.request.is_some());
}

#[test]
fn input_from_inside_the_size_slider_is_ignored() {
    let mut form = FilterForm::new("filter-form");
    form.push(FormControl::text("title", "title"));
    form.push(FormControl::hidden("min-price", "min_price"));
    form.push(FormControl::hidden("max-price", "max_price"));
    form.push(FormControl::text("size-handle", "").inside("size-slider"));
    form.push(FormControl::hidden("min-size", "min_size"));
    form.push(FormControl::hidden("max-size", "max_size"));
    let page = Page::new(form)
        .with_slider_container("price-slider")
        .with_slider_container("size-slider")
        .with_label("price-range-label", "")
        .with_label("size-range-label", "")
        .with_container("games-list", "");
    let (mut controller, requests) = FilterController::init(sized_config(), page).unwrap();
    assert_eq!(requests.len(), 2);

    for target in ["size-handle", "size-slider"] {
        let outcome = controller.handle(FormEvent::Input {
            target: target.to_string(),
        });
        assert!(outcome.request.is_none(), "{target} should not fetch");
    }
    assert_eq!(controller.stats().issued, 2);

    let outcome = controller.handle(FormEvent::Input {
        target: "title".to_string(),
    });
    assert!(outcome.request.is_some());
}

#[test]
fn latest_issued_is_the_default_policy() {
    assert_eq!(ResponsePolicy::default(), ResponsePolicy::LatestIssued);
    assert_eq!(ControllerConfig::default().policy, ResponsePolicy::LatestIssued);
    assert_eq!(
        ResponsePolicy::parse("last-resolved"),
        Some(ResponsePolicy::LastResolved)
    );
    assert_eq!(ResponsePolicy::parse("newest-first"), None);
}

#[test]
fn change_inside_a_slider_still_fetches() {
    let (mut controller, _) = price_only();
    let outcome = controller.handle(FormEvent::Change {
        target: "price-slider".to_string(),
    });
    assert!(outcome.request.is_some());
}

#[test]
fn submit_is_prevented_without_a_request() {
    let (mut controller, _) = price_only();
    let before = controller.stats().issued;
    let outcome = controller.handle(FormEvent::Submit);
    assert!(outcome.prevent_default);
    assert!(outcome.request.is_none());
    assert_eq!(controller.stats().issued, before);
}

#[test]
fn response_replaces_listing_verbatim() {
    let (mut controller, requests) = price_only();
    let html = "<li class=\"card\">Half-Life &amp; <b>2</b></li>\n<script>x()</script>";
    let disposition = controller.complete(ok(requests[0].seq, html));
    assert!(matches!(disposition, ResponseDisposition::Applied));
    assert_eq!(listing(&controller), html);
}

#[test]
fn latest_issued_policy_drops_stale_responses() {
    let (mut controller, _) = price_only();
    let first = controller.set_slider(Dimension::Price, 5.0, 50.0).unwrap();
    let second = controller.set_slider(Dimension::Price, 6.0, 60.0).unwrap();
    let (first, second) = (first.request.unwrap(), second.request.unwrap());

    controller.complete(ok(second.seq, "second"));
    let disposition = controller.complete(ok(first.seq, "first"));

    assert!(matches!(
        disposition,
        ResponseDisposition::Discarded { latest_applied } if latest_applied == second.seq
    ));
    assert_eq!(listing(&controller), "second");
    assert_eq!(controller.stats().discarded, 1);
}

#[test]
fn last_resolved_policy_applies_in_resolution_order() {
    let ids = ElementIds::default();
    let config = ControllerConfig {
        policy: ResponsePolicy::LastResolved,
        ..ControllerConfig::default()
    };
    let (mut controller, _) =
        FilterController::init(config, Page::catalogue(&ids, &[], false)).unwrap();
    let first = controller.set_slider(Dimension::Price, 5.0, 50.0).unwrap();
    let second = controller.set_slider(Dimension::Price, 6.0, 60.0).unwrap();

    controller.complete(ok(second.request.unwrap().seq, "second"));
    controller.complete(ok(first.request.unwrap().seq, "first"));

    assert_eq!(listing(&controller), "first");
    assert_eq!(controller.stats().applied, 2);
}

#[test]
fn failed_request_keeps_current_listing() {
    let (mut controller, requests) = price_only();
    controller.complete(ok(requests[0].seq, "<p>ok</p>"));
    let next = controller.set_slider(Dimension::Price, 1.0, 2.0).unwrap();
    let disposition = controller.complete(FetchCompletion {
        seq: next.request.unwrap().seq,
        result: Err(FetchError::Status {
            url: "http://shop.local/catalogue?".to_string(),
            status: 500,
        }),
    });
    assert!(matches!(disposition, ResponseDisposition::Failed(_)));
    assert_eq!(listing(&controller), "<p>ok</p>");
    assert_eq!(controller.stats().failed, 1);
}

#[test]
fn missing_listing_container_fails_init() {
    let ids = ElementIds::default();
    let mut form = FilterForm::new(ids.form.clone());
    form.push(FormControl::hidden("min-price", "min_price"));
    form.push(FormControl::hidden("max-price", "max_price"));
    let page = Page::new(form)
        .with_slider_container("price-slider")
        .with_label("price-range-label", "");
    let err = FilterController::init(ControllerConfig::default(), page).unwrap_err();
    assert!(matches!(err, ControllerError::MissingElement { id } if id == "games-list"));
}

#[test]
fn size_bounds_require_size_elements() {
    let ids = ElementIds::default();
    let err =
        FilterController::init(sized_config(), Page::catalogue(&ids, &[], false)).unwrap_err();
    assert!(matches!(err, ControllerError::MissingElement { id } if id == "size-slider"));
}

#[test]
fn custom_element_ids_are_honoured() {
    let ids = ElementIds {
        listing: "results".to_string(),
        min_price: "price-lo".to_string(),
        ..ElementIds::default()
    };
    let config = ControllerConfig {
        ids: ids.clone(),
        ..ControllerConfig::default()
    };
    let (controller, _) =
        FilterController::init(config, Page::catalogue(&ids, &[], false)).unwrap();
    assert_eq!(controller.page().form().value_of("price-lo"), Some("0"));
    assert_eq!(controller.page().inner_html("results"), Some(""));
}

/// Answers every query with a fragment naming it, and remembers what it saw.
#[derive(Default)]
struct RecordingSource {
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl ListingSource for RecordingSource {
    async fn fetch_fragment(&self, query: &str) -> Result<String, FetchError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(format!("<ul data-query=\"{query}\"></ul>"))
    }
}

struct FailingSource;

#[async_trait]
impl ListingSource for FailingSource {
    async fn fetch_fragment(&self, _query: &str) -> Result<String, FetchError> {
        Err(FetchError::Status {
            url: "http://shop.local/catalogue".to_string(),
            status: 503,
        })
    }
}

struct PanickingSource;

#[async_trait]
impl ListingSource for PanickingSource {
    async fn fetch_fragment(&self, _query: &str) -> Result<String, FetchError> {
        panic!("listing source crashed")
    }
}

fn start_session(source: Arc<dyn ListingSource>) -> Session {
    let ids = ElementIds::default();
    Session::start(
        ControllerConfig::default(),
        Page::catalogue(&ids, &genres(), false),
        source,
    )
    .unwrap()
}

#[tokio::test]
async fn session_loads_initial_listing() {
    let source = Arc::new(RecordingSource::default());
    let mut session = start_session(source.clone());
    assert_eq!(session.in_flight(), 1);
    session.settle().await;
    assert_eq!(session.in_flight(), 0);
    assert_eq!(
        session.listing(),
        "<ul data-query=\"min_price=0&max_price=100\"></ul>"
    );
    assert_eq!(source.queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn clicking_a_checkbox_fires_input_and_change() {
    let source = Arc::new(RecordingSource::default());
    let mut session = start_session(source.clone());
    let started = session.set_genre("Action", true).unwrap();
    assert_eq!(started, 2);
    session.settle().await;

    let queries = source.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 3);
    assert!(queries[1..]
        .iter()
        .all(|q| q == "min_price=0&max_price=100&genres=Action"));
    assert_eq!(
        session.listing(),
        "<ul data-query=\"min_price=0&max_price=100&genres=Action\"></ul>"
    );
}

#[tokio::test]
async fn ticking_a_genre_submits_its_exact_value() {
    let source = Arc::new(RecordingSource::default());
    let mut session = Session::start(
        ControllerConfig::default(),
        Page::catalogue(
            &ElementIds::default(),
            &["Sci-Fi".to_string(), "Sci Fi".to_string()],
            false,
        ),
        source.clone(),
    )
    .unwrap();
    assert_eq!(session.set_genre("Sci Fi", true).unwrap(), 2);
    session.settle().await;

    let queries = source.queries.lock().unwrap().clone();
    assert_eq!(
        queries.last().map(String::as_str),
        Some("min_price=0&max_price=100&genres=Sci+Fi")
    );
}

#[tokio::test]
async fn typing_into_search_fires_one_request() {
    let source = Arc::new(RecordingSource::default());
    let mut session = start_session(source.clone());
    assert_eq!(session.type_text("title", "zelda").unwrap(), 1);
    assert_eq!(session.submit(), 0);
    assert_eq!(session.default_prevented(), 1);
    session.settle().await;
    assert_eq!(source.queries.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn session_rejects_non_checkbox_toggles() {
    let mut session = start_session(Arc::new(RecordingSource::default()));
    assert!(matches!(
        session.set_checkbox("title", true),
        Err(SessionError::NotACheckbox { .. })
    ));
    assert!(matches!(
        session.set_genre("Racing", true),
        Err(SessionError::Controller(ControllerError::UnknownControl { .. }))
    ));
    session.settle().await;
}

#[tokio::test]
async fn failures_leave_the_listing_empty() {
    let mut session = start_session(Arc::new(FailingSource));
    session.move_slider(Dimension::Price, 10.0, 20.0).unwrap();
    let dispositions = session.settle().await;
    assert_eq!(dispositions.len(), 2);
    assert!(dispositions
        .iter()
        .all(|d| matches!(d, ResponseDisposition::Failed(_))));
    assert_eq!(session.listing(), "");
    assert_eq!(session.controller().stats().failed, 2);
}

#[tokio::test]
async fn crashed_fetch_task_still_settles() {
    let mut session = start_session(Arc::new(PanickingSource));
    session.move_slider(Dimension::Price, 10.0, 20.0).unwrap();
    let dispositions = tokio::time::timeout(std::time::Duration::from_secs(5), session.settle())
        .await
        .expect("settle should not hang on a crashed task");
    assert_eq!(dispositions.len(), 2);
    assert!(dispositions.iter().all(|d| matches!(
        d,
        ResponseDisposition::Failed(FetchError::TaskFailed { .. })
    )));
    assert_eq!(session.in_flight(), 0);
    assert_eq!(session.listing(), "");
}

#[test]
fn session_commands_parse() {
    assert_eq!(
        SessionCommand::parse("price 10 40").unwrap(),
        Some(SessionCommand::Slide {
            dimension: Dimension::Price,
            low: 10.0,
            high: 40.0,
        })
    );
    assert_eq!(
        SessionCommand::parse("title  half life ").unwrap(),
        Some(SessionCommand::Type {
            id: "title".to_string(),
            text: "half life".to_string(),
        })
    );
    assert_eq!(
        SessionCommand::parse("check Massively Multiplayer").unwrap(),
        Some(SessionCommand::Check {
            genre: "Massively Multiplayer".to_string(),
        })
    );
    assert_eq!(SessionCommand::parse("   ").unwrap(), None);
    assert!(SessionCommand::parse("size 1").is_err());
    assert!(SessionCommand::parse("price a b").is_err());
    assert!(SessionCommand::parse("dance").is_err());
}

/// One-shot HTTP/1.1 server: answers the first connection and hands back the raw request.
async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        let response = format!(
            "{status_line}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&request).to_string()
    });
    (format!("http://{addr}"), handle)
}

#[tokio::test]
async fn http_source_sends_ajax_get_and_returns_body_verbatim() {
    let body = "<div class=\"game\">Stardew &amp; <em>Valley</em></div>\n";
    let (base_url, server) = serve_once("HTTP/1.1 200 OK", body).await;
    let source = HttpListingSource::new(&HttpSourceOptions {
        base_url,
        ..HttpSourceOptions::default()
    })
    .unwrap();

    let fragment = source
        .fetch_fragment("title=half+life&genres=Action&genres=RPG")
        .await
        .unwrap();
    assert_eq!(fragment, body);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /catalogue?title=half+life&genres=Action&genres=RPG HTTP/1.1\r\n"));
    assert!(request
        .to_lowercase()
        .contains("x-requested-with: xmlhttprequest"));
}

#[tokio::test]
async fn http_source_reports_error_status() {
    let (base_url, server) = serve_once("HTTP/1.1 500 Internal Server Error", "boom").await;
    let source = HttpListingSource::new(&HttpSourceOptions {
        base_url,
        ..HttpSourceOptions::default()
    })
    .unwrap();
    let err = source.fetch_fragment("").await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 500, .. }));
    let request = server.await.unwrap();
    assert!(request.starts_with("GET /catalogue"));
}

#[tokio::test]
async fn http_source_sends_extra_header() {
    let (base_url, server) = serve_once("HTTP/1.1 200 OK", "").await;
    let source = HttpListingSource::new(&HttpSourceOptions {
        base_url,
        header: Some("Cookie: session=abc".to_string()),
        ..HttpSourceOptions::default()
    })
    .unwrap();
    assert_eq!(source.fetch_fragment("").await.unwrap(), "");
    let request = server.await.unwrap().to_lowercase();
    assert!(request.contains("cookie: session=abc"));
}

#[test]
fn catalogue_vars_parse_from_page_script() {
    let script = r#"window.catalogueVars = {
        "minPrice": 0, "maxPrice": 59.99,
        "minPriceStart": 4.99, "maxPriceStart": 40,
        "minSize": 0.5, "maxSize": 150,
        "minSizeStart": 1, "maxSizeStart": 80
    };"#;
    let vars = config::parse_catalogue_vars(script).unwrap();
    assert_eq!(vars.price_bounds(), RangeBounds::new(0.0, 59.99, 4.99, 40.0));
    assert_eq!(vars.size_bounds(), Some(RangeBounds::new(0.5, 150.0, 1.0, 80.0)));
}

#[test]
fn catalogue_vars_without_size_disable_the_size_slider() {
    let vars = config::parse_catalogue_vars(r#"{"minPrice": 5, "maxPrice": 60}"#).unwrap();
    assert_eq!(vars.price_bounds(), RangeBounds::full(5.0, 60.0));
    assert!(vars.size_bounds().is_none());
    assert!(config::parse_catalogue_vars("window.catalogueVars = null;").is_err());
}

#[test]
fn config_file_loads_from_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yml");
    std::fs::write(
        &path,
        r#"
base_url: http://shop.local:5000
policy: last-resolved
price: { min: 0, max: 60, start_min: 5, start_max: 40 }
genres: [Action, RPG]
element_ids:
  listing: results
"#,
    )
    .unwrap();
    let cfg = config::load_config(&path, false).unwrap();
    assert_eq!(cfg.base_url.as_deref(), Some("http://shop.local:5000"));
    assert_eq!(cfg.response_policy.as_deref(), Some("last-resolved"));
    assert_eq!(cfg.price, Some(RangeBounds::new(0.0, 60.0, 5.0, 40.0)));
    let ids = cfg.element_ids.unwrap();
    assert_eq!(ids.listing, "results");
    assert_eq!(ids.form, "filter-form");
}

#[test]
fn missing_config_is_allowed_only_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yml");
    assert!(config::load_config(&path, true).is_ok());
    assert!(config::load_config(&path, false).is_err());
}

#[test]
fn default_config_is_written_once_and_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.yml");
    config::ensure_default_config_file(&path).unwrap();
    let cfg = config::load_config(&path, false).unwrap();
    assert_eq!(cfg.endpoint.as_deref(), Some("/catalogue"));
    assert_eq!(cfg.price, Some(RangeBounds::full(0.0, 100.0)));
    assert_eq!(cfg.genres, Some(Vec::new()));
}
