//! Dashboard state and the actions that drive it.
//!
//! `DashboardState` holds everything the view depends on and exposes one
//! transition per user-visible action. `Dashboard` pairs the state with a
//! backend client and performs the I/O.

use crate::analysis::{self, Aggregates};
use crate::backend::{classify, FetchError, FetchOutcome, RecordClient};
use crate::models::{Record, RowKey, SearchField, SearchQuery, TableRow};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// User-facing outcome of the last fetch. Only one is shown at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMessage {
    /// The backend answered with an empty array.
    NoRecords,
    /// The body was neither an array nor an object.
    UnexpectedFormat,
    /// Network error, non-2xx status or undecodable body.
    ConnectionFailed,
}

impl StatusMessage {
    /// Empty results are informational; the others are failures.
    pub fn is_error(&self) -> bool {
        !matches!(self, StatusMessage::NoRecords)
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::NoRecords => write!(f, "No records found for this search."),
            StatusMessage::UnexpectedFormat => write!(f, "Unexpected data format from server."),
            StatusMessage::ConnectionFailed => write!(
                f,
                "Connection failed. Please ensure the backend is reachable."
            ),
        }
    }
}

/// Which row, if any, shows its full field listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Expansion {
    #[default]
    Collapsed,
    Expanded(RowKey),
}

impl Expansion {
    /// Expand `key`, or collapse if it is already the expanded row.
    pub fn toggle(&mut self, key: RowKey) {
        *self = match self {
            Expansion::Expanded(current) if *current == key => Expansion::Collapsed,
            _ => Expansion::Expanded(key),
        };
    }

    pub fn is_expanded(&self, key: &RowKey) -> bool {
        matches!(self, Expansion::Expanded(current) if current == key)
    }

    pub fn current(&self) -> Option<&RowKey> {
        match self {
            Expansion::Expanded(key) => Some(key),
            Expansion::Collapsed => None,
        }
    }
}

/// Everything the dashboard view is rendered from.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    records: Vec<Record>,
    loading: bool,
    message: Option<StatusMessage>,
    form: SearchQuery,
    expansion: Expansion,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn message(&self) -> Option<StatusMessage> {
        self.message
    }

    /// Current contents of the search form.
    pub fn form(&self) -> &SearchQuery {
        &self.form
    }

    pub fn expansion(&self) -> &Expansion {
        &self.expansion
    }

    pub fn set_field(&mut self, field: SearchField) {
        self.form.field = field;
    }

    pub fn set_term(&mut self, term: impl Into<String>) {
        self.form.term = term.into();
    }

    /// Mark a fetch as started and clear the previous message.
    pub fn begin_fetch(&mut self) {
        self.loading = true;
        self.message = None;
    }

    /// Apply the result of a fetch. Always clears the loading flag.
    ///
    /// Successful bodies replace the result set wholesale. Transport
    /// failures leave the previous result set in place.
    pub fn complete_fetch(&mut self, result: Result<Value, FetchError>) {
        self.loading = false;

        match result {
            Ok(body) => match classify(body) {
                FetchOutcome::Records(records) => {
                    debug!("Received {} records", records.len());
                    if records.is_empty() {
                        self.message = Some(StatusMessage::NoRecords);
                    }
                    self.records = records;
                }
                FetchOutcome::Single(record) => {
                    debug!("Received single record");
                    self.records = vec![record];
                }
                FetchOutcome::Malformed => {
                    self.records.clear();
                    self.message = Some(StatusMessage::UnexpectedFormat);
                }
            },
            Err(e) => {
                error!("Fetch error: {}", e);
                self.message = Some(StatusMessage::ConnectionFailed);
            }
        }
    }

    /// Toggle expansion of a row. The expanded key survives later fetches.
    pub fn toggle_expand(&mut self, key: RowKey) {
        self.expansion.toggle(key);
    }

    /// Map user input to the key of a displayed row.
    ///
    /// `#3` always names the row at position 3 and `"7"` always names the
    /// string id `7`. Bare input selects the first displayed row whose key
    /// prints the same, so an id wins over a position. Input matching no
    /// current row is taken as an identifier, numeric when it parses as one.
    pub fn resolve_row_key(&self, input: &str) -> RowKey {
        let input = input.trim();

        if let Some(index) = input.strip_prefix('#').and_then(|n| n.parse().ok()) {
            return RowKey::Index(index);
        }
        if let Some(quoted) = input
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            return RowKey::text(quoted);
        }

        self.records
            .iter()
            .enumerate()
            .map(|(idx, record)| record.row_key(idx))
            .find(|key| match key {
                RowKey::Id(id) => id.display() == input,
                RowKey::Index(idx) => idx.to_string() == input,
            })
            .unwrap_or_else(|| RowKey::from_input(input))
    }

    /// Whether a row renders expanded.
    ///
    /// A lone result of an id search is always expanded, whatever the
    /// tracked key says.
    pub fn is_expanded(&self, key: &RowKey) -> bool {
        self.auto_expand() || self.expansion.is_expanded(key)
    }

    fn auto_expand(&self) -> bool {
        self.form.field == SearchField::Id && self.records.len() == 1
    }

    /// Table rows for the current result set.
    pub fn rows(&self) -> Vec<TableRow> {
        self.records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let expanded = self.is_expanded(&record.row_key(idx));
                TableRow::from_record(record, idx, expanded)
            })
            .collect()
    }

    /// Frequency tables for the charts.
    pub fn aggregate(&self) -> Aggregates {
        analysis::aggregate(&self.records)
    }
}

/// Holds the loading flag for the duration of a fetch.
///
/// Dropping the guard clears the flag, so a cancelled fetch never leaves
/// the dashboard stuck in the loading state.
struct LoadingGuard<'a> {
    state: &'a mut DashboardState,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(state: &'a mut DashboardState) -> Self {
        state.begin_fetch();
        Self { state }
    }

    fn complete(self, result: Result<Value, FetchError>) {
        self.state.complete_fetch(result);
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.loading = false;
    }
}

/// The dashboard: state plus the client that feeds it.
pub struct Dashboard {
    client: RecordClient,
    state: DashboardState,
    show_spinner: bool,
}

impl Dashboard {
    pub fn new(client: RecordClient, show_spinner: bool) -> Self {
        Self {
            client,
            state: DashboardState::new(),
            show_spinner,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DashboardState {
        &mut self.state
    }

    pub fn client(&self) -> &RecordClient {
        &self.client
    }

    /// Initial load. Always queries all/accounts, whatever the form holds.
    pub async fn mount(&mut self) {
        self.fetch_data(SearchQuery::mount()).await;
    }

    /// Submit the search form as it currently stands.
    pub async fn submit_search(&mut self) {
        let query = self.state.form.clone();
        self.fetch_data(query).await;
    }

    /// Fetch `query` and apply the outcome to the state.
    ///
    /// Every failure ends up in the message slot; nothing is returned.
    pub async fn fetch_data(&mut self, query: SearchQuery) {
        info!(
            "Fetching records: field={} term={}",
            query.field,
            query.effective_term()
        );

        let spinner = self.show_spinner.then(loading_spinner);
        let guard = LoadingGuard::acquire(&mut self.state);
        let result = self.client.fetch(&query).await;

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        guard.complete(result);
    }
}

fn loading_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Loading dynamic data...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Liveness check. Reports to the user and the log, never touches dashboard state.
pub async fn ping(client: &RecordClient) -> bool {
    match client.ping().await {
        Ok(body) => {
            let summary = match &body {
                Value::Array(items) => format!("{} records", items.len()),
                Value::Object(map) => format!("object with {} fields", map.len()),
                other => other.to_string(),
            };
            info!("Backend alive: {}", summary);
            debug!("Ping response: {}", body);
            println!("✅ Backend is alive! Check the log output for the response.");
            true
        }
        Err(e) => {
            error!("Ping failed: {}", e);
            println!("❌ Backend unreachable!");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dashboard_for(server: &MockServer) -> Dashboard {
        let client = RecordClient::new(&ClientConfig {
            base_url: server.uri(),
            timeout_seconds: None,
        })
        .unwrap();
        Dashboard::new(client, false)
    }

    fn transport_error() -> FetchError {
        FetchError::Connect {
            url: "http://localhost:1".to_string(),
        }
    }

    fn energy_records() -> Value {
        json!([
            { "id": 1, "sector": "Energy", "region": "EU" },
            { "id": 2, "sector": "Energy", "region": "EU" }
        ])
    }

    #[test]
    fn test_expansion_state_machine() {
        let mut expansion = Expansion::default();
        let a = RowKey::text("a");
        let b = RowKey::Index(3);

        expansion.toggle(a.clone());
        assert_eq!(expansion, Expansion::Expanded(a.clone()));

        expansion.toggle(b.clone());
        assert_eq!(expansion, Expansion::Expanded(b.clone()));

        expansion.toggle(b);
        assert_eq!(expansion, Expansion::Collapsed);
        assert!(expansion.current().is_none());
    }

    #[test]
    fn test_energy_scenario() {
        let mut state = DashboardState::new();
        state.set_field(SearchField::Sector);
        state.set_term("Energy");
        state.complete_fetch(Ok(energy_records()));

        let aggregates = state.aggregate();
        assert_eq!(aggregates.by_sector.get("Energy"), Some(2));
        assert_eq!(aggregates.by_region.get("EU"), Some(2));

        let rows = state.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| !r.expanded));
        assert!(state.message().is_none());
    }

    #[test]
    fn test_truncates_to_fifty() {
        let items: Vec<Value> = (1..=120).map(|i| json!({ "id": i })).collect();
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(Value::Array(items)));

        assert_eq!(state.records().len(), 50);
        assert_eq!(state.records()[0].id().as_deref(), Some("1"));
        assert_eq!(state.records()[49].id().as_deref(), Some("50"));
    }

    #[test]
    fn test_empty_array_sets_message() {
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(energy_records()));
        state.begin_fetch();
        state.complete_fetch(Ok(json!([])));

        assert!(state.records().is_empty());
        assert_eq!(state.message(), Some(StatusMessage::NoRecords));
        assert!(!StatusMessage::NoRecords.is_error());
        assert_eq!(
            state.message().map(|m| m.to_string()).as_deref(),
            Some("No records found for this search.")
        );
    }

    #[test]
    fn test_single_object_wrapped() {
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(json!({ "id": 9, "sector": "Retail" })));

        assert_eq!(state.records().len(), 1);
        assert_eq!(state.records()[0].sector().as_deref(), Some("Retail"));
    }

    #[test]
    fn test_malformed_clears_records() {
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(energy_records()));
        state.complete_fetch(Ok(json!("surprise")));

        assert!(state.records().is_empty());
        assert_eq!(state.message(), Some(StatusMessage::UnexpectedFormat));
    }

    #[test]
    fn test_transport_failure_keeps_records() {
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(energy_records()));
        state.begin_fetch();
        state.complete_fetch(Err(transport_error()));

        assert!(!state.is_loading());
        assert_eq!(state.records().len(), 2);
        assert_eq!(state.message(), Some(StatusMessage::ConnectionFailed));
    }

    #[test]
    fn test_later_outcome_overwrites_message() {
        let mut state = DashboardState::new();
        state.begin_fetch();
        state.complete_fetch(Err(transport_error()));
        state.begin_fetch();
        assert!(state.message().is_none());
        assert!(state.is_loading());

        state.complete_fetch(Ok(energy_records()));
        assert!(state.message().is_none());
        assert!(!state.is_loading());
    }

    #[test]
    fn test_reapplying_outcome_is_stable() {
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(energy_records()));
        let first = state.rows();
        state.complete_fetch(Ok(energy_records()));

        assert_eq!(state.rows(), first);
    }

    #[test]
    fn test_toggle_twice_collapses() {
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(energy_records()));

        let key = state.resolve_row_key("2");
        state.toggle_expand(key.clone());
        assert!(state.rows()[1].expanded);
        assert!(!state.rows()[0].expanded);

        state.toggle_expand(key);
        assert!(state.rows().iter().all(|r| !r.expanded));
    }

    #[test]
    fn test_resolve_row_key_uses_index_without_id() {
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(json!([{ "sector": "A" }, { "id": "x" }])));

        assert_eq!(state.resolve_row_key("0"), RowKey::Index(0));
        assert_eq!(state.resolve_row_key("x"), RowKey::text("x"));
        assert_eq!(state.resolve_row_key("1"), RowKey::from_input("1"));
    }

    #[test]
    fn test_ids_of_different_types_expand_separately() {
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(json!([
            { "id": 1, "sector": "Energy" },
            { "id": "1", "sector": "Retail" }
        ])));

        let key = state.rows()[0].key.clone();
        state.toggle_expand(key);
        let expanded: Vec<bool> = state.rows().iter().map(|r| r.expanded).collect();
        assert_eq!(expanded, vec![true, false]);

        state.toggle_expand(state.resolve_row_key("\"1\""));
        let expanded: Vec<bool> = state.rows().iter().map(|r| r.expanded).collect();
        assert_eq!(expanded, vec![false, true]);
    }

    #[test]
    fn test_index_form_reaches_row_shadowed_by_id() {
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(json!([
            { "id": "3" },
            { "sector": "A" },
            { "sector": "B" },
            { "sector": "C" }
        ])));

        assert_eq!(state.resolve_row_key("3"), RowKey::text("3"));
        assert_eq!(state.resolve_row_key("#3"), RowKey::Index(3));

        state.toggle_expand(state.resolve_row_key("#3"));
        let rows = state.rows();
        assert!(rows[3].expanded);
        assert!(!rows[0].expanded);
    }

    #[test]
    fn test_expanded_key_survives_fetch() {
        let mut state = DashboardState::new();
        state.complete_fetch(Ok(energy_records()));
        state.toggle_expand(RowKey::from_input("1"));

        state.complete_fetch(Ok(json!([{ "id": 1, "sector": "Mining" }])));

        assert_eq!(
            state.expansion().current(),
            Some(&RowKey::from_input("1"))
        );
        assert!(state.rows()[0].expanded);
    }

    #[test]
    fn test_id_search_auto_expands_single_record() {
        let mut state = DashboardState::new();
        state.set_field(SearchField::Id);
        state.complete_fetch(Ok(json!({})));

        let rows = state.rows();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].expanded);
        assert_eq!(rows[0].id, "N/A");
        assert_eq!(rows[0].sector, "N/A");
        assert_eq!(rows[0].pest, "N/A");
        assert_eq!(rows[0].details.as_ref().map(|d| d.len()), Some(0));

        // toggling does not collapse an auto-expanded row
        state.toggle_expand(rows[0].key.clone());
        state.toggle_expand(rows[0].key.clone());
        assert!(state.rows()[0].expanded);
    }

    #[test]
    fn test_auto_expand_needs_exactly_one_record() {
        let mut state = DashboardState::new();
        state.set_field(SearchField::Id);
        state.complete_fetch(Ok(energy_records()));

        assert!(state.rows().iter().all(|r| !r.expanded));
    }

    #[tokio::test]
    async fn test_mount_ignores_form() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/all/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(energy_records()))
            .expect(1)
            .mount(&server)
            .await;

        let mut dashboard = dashboard_for(&server);
        dashboard.state_mut().set_field(SearchField::Region);
        dashboard.state_mut().set_term("Asia");
        dashboard.mount().await;

        assert_eq!(dashboard.state().records().len(), 2);
        assert!(!dashboard.state().is_loading());
    }

    #[tokio::test]
    async fn test_submit_uses_form_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/sector/Energy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(energy_records()))
            .expect(1)
            .mount(&server)
            .await;

        let mut dashboard = dashboard_for(&server);
        dashboard.state_mut().set_field(SearchField::Sector);
        dashboard.state_mut().set_term("  Energy ");
        dashboard.submit_search().await;

        assert_eq!(dashboard.state().records().len(), 2);
        assert!(dashboard.state().message().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_connection_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut dashboard = dashboard_for(&server);
        dashboard.mount().await;

        assert_eq!(
            dashboard.state().message(),
            Some(StatusMessage::ConnectionFailed)
        );
        assert!(!dashboard.state().is_loading());
    }

    #[tokio::test]
    async fn test_cancelled_fetch_releases_loading() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(energy_records())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let mut dashboard = dashboard_for(&server);
        let outcome =
            tokio::time::timeout(Duration::from_millis(100), dashboard.mount()).await;

        assert!(outcome.is_err());
        assert!(!dashboard.state().is_loading());
        assert!(dashboard.state().records().is_empty());
    }

    #[tokio::test]
    async fn test_ping_leaves_state_alone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/all/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(energy_records()))
            .mount(&server)
            .await;

        let mut dashboard = dashboard_for(&server);
        dashboard.state_mut().complete_fetch(Err(transport_error()));

        assert!(ping(dashboard.client()).await);
        assert_eq!(
            dashboard.state().message(),
            Some(StatusMessage::ConnectionFailed)
        );
        assert!(dashboard.state().records().is_empty());
    }

    #[test]
    fn test_ping_reports_unreachable_backend() {
        let client = RecordClient::new(&ClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_seconds: Some(2),
        })
        .unwrap();

        let alive = tokio_test::block_on(ping(&client));
        assert!(!alive);
    }
}
