//! Shared test doubles for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use crate::domain::ParcelRecord;
use crate::domain::ports::{ParcelRequest, ParcelResponse, ParcelSource, ParcelSourceError};

pub const POINT_GEOMETRY: &str = r#"{"type":"Point","coordinates":[-96.797,32.7767]}"#;

pub fn parcel_record(id: &str, geometry: &str) -> ParcelRecord {
    ParcelRecord {
        id: id.to_owned(),
        address: format!("{id} Elm St"),
        county: "Dallas".to_owned(),
        sqft: Some(1_500.0),
        price: 120_000.0,
        geometry: geometry.to_owned(),
    }
}

pub fn parcel_records(ids: &[&str]) -> Vec<ParcelRecord> {
    ids.iter().map(|id| parcel_record(id, POINT_GEOMETRY)).collect()
}

struct ScriptedCall {
    result: Result<ParcelResponse, ParcelSourceError>,
    gate: Option<Arc<Notify>>,
}

/// Parcel source replaying scripted results in call order.
///
/// Gated calls park until the test releases their `Notify`, so the test
/// decides the order in which responses arrive. The source ignores its
/// cancellation token on purpose, like an uncooperative transport.
#[derive(Default)]
pub struct ScriptedParcelSource {
    script: Mutex<VecDeque<ScriptedCall>>,
    requests: Mutex<Vec<ParcelRequest>>,
    entered: Mutex<Option<mpsc::UnboundedSender<usize>>>,
}

impl ScriptedParcelSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, result: Result<ParcelResponse, ParcelSourceError>) -> Self {
        self.push(result, None);
        self
    }

    pub fn respond_records(self, ids: &[&str]) -> Self {
        self.respond(Ok(ParcelResponse {
            records: parcel_records(ids),
        }))
    }

    /// Script a call that waits for the returned gate to be notified.
    pub fn respond_gated(&self, result: Result<ParcelResponse, ParcelSourceError>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(result, Some(Arc::clone(&gate)));
        gate
    }

    /// Receive the 1-based call index each time a call starts.
    pub fn entered(&self) -> mpsc::UnboundedReceiver<usize> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.entered.lock().expect("entered mutex") = Some(tx);
        rx
    }

    pub fn requests(&self) -> Vec<ParcelRequest> {
        self.requests.lock().expect("requests mutex").clone()
    }

    fn push(&self, result: Result<ParcelResponse, ParcelSourceError>, gate: Option<Arc<Notify>>) {
        self.script
            .lock()
            .expect("script mutex")
            .push_back(ScriptedCall { result, gate });
    }
}

#[async_trait]
impl ParcelSource for ScriptedParcelSource {
    async fn fetch_parcels(
        &self,
        request: &ParcelRequest,
        _cancel: CancellationToken,
    ) -> Result<ParcelResponse, ParcelSourceError> {
        let (index, call) = {
            let mut requests = self.requests.lock().expect("requests mutex");
            requests.push(request.clone());
            let call = self.script.lock().expect("script mutex").pop_front();
            (requests.len(), call)
        };
        if let Some(entered) = self.entered.lock().expect("entered mutex").as_ref() {
            entered.send(index).expect("send entry");
        }
        let Some(call) = call else {
            return Err(ParcelSourceError::transport("source script exhausted"));
        };
        if let Some(gate) = call.gate {
            gate.notified().await;
        }
        call.result
    }
}
