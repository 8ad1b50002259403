//! Behaviour tests for parcel map synchronisation.
//!
//! These scenarios drive a `MapSession` through its public API against a
//! scripted endpoint whose responses the steps release explicitly, so the
//! arrival order is fixed by the scenario rather than by timing.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parcels::domain::ports::{
    CredentialProvider, CredentialProviderError, FilterStore, ParcelRequest, ParcelResponse,
    ParcelSource, ParcelSourceError,
};
use parcels::domain::{
    BearerToken, ExportError, FilterCriteria, MapSession, MapSessionPorts, ParcelRecord, Role,
    SyncSnapshot,
};
use parcels::outbound::filter_store::MemoryFilterStore;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

const FILTERS_KEY: &str = "dallas_filters";
const POINT_GEOMETRY: &str = r#"{"type":"Point","coordinates":[-96.797,32.7767]}"#;

fn parcels(count: usize) -> Vec<ParcelRecord> {
    (1..=count)
        .map(|index| ParcelRecord {
            id: format!("parcel-{index}"),
            address: format!("{index} Main St"),
            county: "Tarrant".to_owned(),
            sqft: Some(1_800.0),
            price: 210_000.0,
            geometry: POINT_GEOMETRY.to_owned(),
        })
        .collect()
}

struct HeldResponse {
    result: Result<ParcelResponse, ParcelSourceError>,
    gate: Option<Arc<Notify>>,
}

/// Endpoint double replaying scripted responses; held ones wait for a gate.
struct ScriptedEndpoint {
    script: Mutex<VecDeque<HeldResponse>>,
    requests: Mutex<Vec<ParcelRequest>>,
    entered: mpsc::UnboundedSender<usize>,
}

#[async_trait]
impl ParcelSource for ScriptedEndpoint {
    async fn fetch_parcels(
        &self,
        request: &ParcelRequest,
        _cancel: CancellationToken,
    ) -> Result<ParcelResponse, ParcelSourceError> {
        let (index, next) = {
            let mut requests = self.requests.lock().expect("requests lock");
            requests.push(request.clone());
            let next = self.script.lock().expect("script lock").pop_front();
            (requests.len(), next)
        };
        self.entered.send(index).expect("entered receiver alive");
        let Some(next) = next else {
            return Err(ParcelSourceError::transport("no scripted response"));
        };
        if let Some(gate) = next.gate {
            gate.notified().await;
        }
        next.result
    }
}

#[derive(Default)]
struct SwitchableCredentials {
    token: Mutex<Option<String>>,
}

#[async_trait]
impl CredentialProvider for SwitchableCredentials {
    async fn current_token(&self) -> Result<Option<BearerToken>, CredentialProviderError> {
        Ok(self
            .token
            .lock()
            .expect("token lock")
            .as_deref()
            .and_then(BearerToken::new))
    }
}

struct ParcelSyncWorld {
    runtime: Runtime,
    endpoint: Arc<ScriptedEndpoint>,
    credentials: Arc<SwitchableCredentials>,
    store: Arc<MemoryFilterStore>,
    session: RefCell<MapSession>,
    entered: RefCell<mpsc::UnboundedReceiver<usize>>,
    gates: RefCell<Vec<Arc<Notify>>>,
    snapshot: RefCell<Option<SyncSnapshot>>,
    export: RefCell<Option<Result<String, ExportError>>>,
}

impl ParcelSyncWorld {
    fn new() -> Self {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("create runtime");
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        let endpoint = Arc::new(ScriptedEndpoint {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            entered: entered_tx,
        });
        let credentials = Arc::new(SwitchableCredentials::default());
        let store = Arc::new(MemoryFilterStore::default());

        let source: Arc<dyn ParcelSource> = Arc::clone(&endpoint) as Arc<dyn ParcelSource>;
        let provider: Arc<dyn CredentialProvider> =
            Arc::clone(&credentials) as Arc<dyn CredentialProvider>;
        let filter_store: Arc<dyn FilterStore> = Arc::clone(&store) as Arc<dyn FilterStore>;
        let session = MapSession::new(
            MapSessionPorts::new(source, provider, filter_store),
            FILTERS_KEY,
        );

        Self {
            runtime,
            endpoint,
            credentials,
            store,
            session: RefCell::new(session),
            entered: RefCell::new(entered_rx),
            gates: RefCell::new(Vec::new()),
            snapshot: RefCell::new(None),
            export: RefCell::new(None),
        }
    }

    fn script(&self, result: Result<ParcelResponse, ParcelSourceError>, held: bool) {
        let gate = held.then(|| Arc::new(Notify::new()));
        if let Some(gate) = &gate {
            self.gates.borrow_mut().push(Arc::clone(gate));
        }
        self.endpoint
            .script
            .lock()
            .expect("script lock")
            .push_back(HeldResponse { result, gate });
    }

    fn wait_for_request(&self) {
        let mut entered = self.entered.borrow_mut();
        self.runtime
            .block_on(entered.recv())
            .expect("request should reach the endpoint");
    }

    fn apply(&self, filters: FilterCriteria) {
        let mut session = self.session.borrow_mut();
        self.runtime.block_on(session.apply_filters(filters));
        drop(session);
        self.wait_for_request();
    }

    fn requests(&self) -> Vec<ParcelRequest> {
        self.endpoint.requests.lock().expect("requests lock").clone()
    }

    fn with_snapshot<F>(&self, f: F)
    where
        F: FnOnce(&SyncSnapshot),
    {
        let snapshot = self.snapshot.borrow();
        f(snapshot.as_ref().expect("the map should have settled"));
    }
}

#[fixture]
fn world() -> ParcelSyncWorld {
    ParcelSyncWorld::new()
}

#[given("a guest map session")]
fn a_guest_map_session(world: &ParcelSyncWorld) {
    *world.credentials.token.lock().expect("token lock") = None;
}

#[given("the endpoint returns {count} parcels")]
fn the_endpoint_returns_parcels(world: &ParcelSyncWorld, count: usize) {
    world.script(
        Ok(ParcelResponse {
            records: parcels(count),
        }),
        false,
    );
}

#[given("the endpoint holds a response of {count} parcels")]
fn the_endpoint_holds_a_response(world: &ParcelSyncWorld, count: usize) {
    world.script(
        Ok(ParcelResponse {
            records: parcels(count),
        }),
        true,
    );
}

#[given("the endpoint is unreachable")]
fn the_endpoint_is_unreachable(world: &ParcelSyncWorld) {
    world.script(
        Err(ParcelSourceError::transport("connection refused")),
        false,
    );
}

#[given("saved filters with a minimum price of {price}")]
fn saved_filters_with_a_minimum_price(world: &ParcelSyncWorld, price: f64) {
    let filters = FilterCriteria::default()
        .with_min_price(price)
        .expect("valid bound");
    world
        .runtime
        .block_on(world.store.save(FILTERS_KEY, &filters))
        .expect("save filters");
}

#[when("the map session starts")]
fn the_map_session_starts(world: &ParcelSyncWorld) {
    let mut session = world.session.borrow_mut();
    world.runtime.block_on(session.start());
    drop(session);
    world.wait_for_request();
}

#[when("the user applies a minimum price of {price}")]
fn the_user_applies_a_minimum_price(world: &ParcelSyncWorld, price: f64) {
    let filters = FilterCriteria::default()
        .with_min_price(price)
        .expect("valid bound");
    world.apply(filters);
}

#[when("the user filters by county {county}")]
fn the_user_filters_by_county(world: &ParcelSyncWorld, county: String) {
    world.apply(FilterCriteria::default().with_county(county));
}

#[when("the user signs in")]
fn the_user_signs_in(world: &ParcelSyncWorld) {
    *world.credentials.token.lock().expect("token lock") = Some("id-token".to_owned());
    let mut session = world.session.borrow_mut();
    world.runtime.block_on(session.refresh_auth());
    drop(session);
    world.wait_for_request();
}

#[when("held response {index} is released")]
fn held_response_is_released(world: &ParcelSyncWorld, index: usize) {
    let gates = world.gates.borrow();
    let gate = gates
        .get(index.checked_sub(1).expect("responses are numbered from 1"))
        .expect("held response exists");
    gate.notify_one();
}

#[when("the map settles")]
fn the_map_settles(world: &ParcelSyncWorld) {
    let mut session = world.session.borrow_mut();
    let snapshot = world.runtime.block_on(session.settle());
    *world.snapshot.borrow_mut() = Some(snapshot);
}

#[when("the user exports the visible parcels")]
fn the_user_exports_the_visible_parcels(world: &ParcelSyncWorld) {
    let result = world.session.borrow().export_csv();
    *world.export.borrow_mut() = Some(result);
}

#[then("the map shows {count} parcels")]
fn the_map_shows_parcels(world: &ParcelSyncWorld, count: usize) {
    world.with_snapshot(|snapshot| assert_eq!(snapshot.result_count(), count));
}

#[then("no error is shown")]
fn no_error_is_shown(world: &ParcelSyncWorld) {
    world.with_snapshot(|snapshot| assert!(snapshot.error.is_none()));
}

#[then("an error is shown")]
fn an_error_is_shown(world: &ParcelSyncWorld) {
    world.with_snapshot(|snapshot| assert!(snapshot.error.is_some()));
}

#[then("the map is not loading")]
fn the_map_is_not_loading(world: &ParcelSyncWorld) {
    world.with_snapshot(|snapshot| assert!(!snapshot.loading));
}

#[then("every request was sent as guest without a county")]
fn every_request_was_sent_as_guest(world: &ParcelSyncWorld) {
    for request in world.requests() {
        assert_eq!(request.query.role(), Role::Guest);
        assert_eq!(request.query.county(), None);
        assert!(request.token.is_none());
    }
}

#[then("the last request was sent as registered for county {county}")]
fn the_last_request_was_registered(world: &ParcelSyncWorld, county: String) {
    let requests = world.requests();
    let last = requests.last().expect("at least one request");
    assert_eq!(last.query.role(), Role::Registered);
    assert_eq!(last.query.county(), Some(county.as_str()));
    assert!(last.token.is_some());
}

#[then("the last request had a minimum price of {price}")]
fn the_last_request_had_a_minimum_price(world: &ParcelSyncWorld, price: f64) {
    let requests = world.requests();
    let last = requests.last().expect("at least one request");
    assert_eq!(last.query.min_price(), Some(price));
}

#[then("the user is told there is no data to export")]
fn the_user_is_told_there_is_no_data(world: &ParcelSyncWorld) {
    let export = world.export.borrow();
    let error = export
        .as_ref()
        .expect("export attempted")
        .as_ref()
        .expect_err("export should be refused");
    assert_eq!(error.to_string(), "No data to export!");
}

#[then("the export has {rows} data rows")]
fn the_export_has_data_rows(world: &ParcelSyncWorld, rows: usize) {
    let export = world.export.borrow();
    let csv = export
        .as_ref()
        .expect("export attempted")
        .as_ref()
        .expect("export should succeed");
    assert_eq!(csv.lines().count(), rows + 1);
}

#[scenario(
    path = "tests/features/parcel_sync.feature",
    name = "Guest applies a price filter"
)]
fn guest_applies_a_price_filter(world: ParcelSyncWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/parcel_sync.feature",
    name = "Signing in during a guest request shows only the registered result"
)]
fn signing_in_during_a_guest_request(world: ParcelSyncWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/parcel_sync.feature",
    name = "A guest response released first cannot replace the registered result"
)]
fn guest_response_released_first(world: ParcelSyncWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/parcel_sync.feature",
    name = "An unreachable endpoint surfaces an error"
)]
fn an_unreachable_endpoint_surfaces_an_error(world: ParcelSyncWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/parcel_sync.feature",
    name = "Exporting with nothing visible reports a notice"
)]
fn exporting_with_nothing_visible(world: ParcelSyncWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/parcel_sync.feature",
    name = "Saved filters are restored on start"
)]
fn saved_filters_are_restored_on_start(world: ParcelSyncWorld) {
    drop(world);
}
