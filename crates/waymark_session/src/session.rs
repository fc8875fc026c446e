use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use waymark_directions::{
    Coordinate, DirectionsError, DirectionsTransport, FetchErrorKind, OrsDirectionsClient,
    RouteResult,
};

use crate::{
    admission::{AdmissionController, Decision, RequestToken},
    config::SessionConfig,
    location::{LocationFix, LocationTracker},
    map_view::{CameraRegion, EdgePadding, MapScene, MapView, Marker, MarkerRole},
    route_selection::{RouteSelection, TapOutcome},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    Tap(Coordinate),
    LongPress,
    Clear,
    UseCurrentLocation,
    LocationUpdate(LocationFix),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Updated,
    FetchStarted(RequestToken),
    FetchRejected(Decision),
    MissingCredential,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Applied,
    Failed(FetchErrorKind),
    /// Superseded or canceled; nothing changed.
    Discarded,
}

/// The result of one spawned fetch, tagged with the token it was admitted under.
#[derive(Debug)]
pub struct FetchCompletion {
    pub token: RequestToken,
    pub start: Coordinate,
    pub end: Coordinate,
    pub outcome: Result<RouteResult, DirectionsError>,
}

struct InFlightFetch {
    token: RequestToken,
    cancel: CancellationToken,
}

/// One map screen's worth of routing state.
///
/// All mutation goes through [`RouteSession::handle_event`] and
/// [`RouteSession::handle_completion`], which are expected to be called from
/// a single task. Fetches run on spawned tasks and report back over a channel.
pub struct RouteSession<T, V> {
    client: Arc<OrsDirectionsClient<T>>,
    admission: AdmissionController,
    selection: RouteSelection,
    location: LocationTracker,
    map_view: V,
    camera_padding: EdgePadding,
    in_flight: Option<InFlightFetch>,
    completion_tx: mpsc::UnboundedSender<FetchCompletion>,
    completion_rx: mpsc::UnboundedReceiver<FetchCompletion>,
    credential_reported: bool,
}

impl<T, V> RouteSession<T, V>
where
    T: DirectionsTransport,
    V: MapView,
{
    pub fn new(config: &SessionConfig, transport: T, map_view: V) -> Self {
        let client = OrsDirectionsClient::new(config.client_params(), transport);
        Self::with_client(config, Arc::new(client), map_view)
    }

    pub fn with_client(
        config: &SessionConfig,
        client: Arc<OrsDirectionsClient<T>>,
        map_view: V,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        Self {
            client,
            admission: AdmissionController::new(config.admission),
            selection: RouteSelection::default(),
            location: LocationTracker::new(config.location_filter),
            map_view,
            camera_padding: config.camera_padding,
            in_flight: None,
            completion_tx,
            completion_rx,
            credential_reported: false,
        }
    }

    pub fn selection(&self) -> &RouteSelection {
        &self.selection
    }

    pub fn route_result(&self) -> Option<&RouteResult> {
        self.selection.result()
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn client(&self) -> &OrsDirectionsClient<T> {
        &self.client
    }

    pub fn map_view(&self) -> &V {
        &self.map_view
    }

    pub fn current_location(&self) -> Option<&LocationFix> {
        self.location.current()
    }

    pub fn has_fetch_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn handle_event(&mut self, event: SessionEvent, now: Timestamp) -> EventOutcome {
        match event {
            SessionEvent::Tap(point) => match self.selection.tap(point) {
                TapOutcome::StartChosen => {
                    self.supersede_in_flight();
                    self.render();
                    EventOutcome::Updated
                }
                TapOutcome::RouteRequested { start, end } => {
                    self.render();
                    self.request_route(start, end, now)
                }
            },
            SessionEvent::LongPress | SessionEvent::Clear => {
                self.supersede_in_flight();
                self.selection.clear();
                self.render();
                EventOutcome::Updated
            }
            SessionEvent::UseCurrentLocation => {
                let Some(fix) = self.location.current().copied() else {
                    debug!("Session: no location fix yet");
                    return EventOutcome::Ignored;
                };

                match self.selection.use_current_location(fix.coordinate) {
                    Ok(()) => {
                        self.render();
                        EventOutcome::Updated
                    }
                    Err(err) => {
                        debug!("Session: {}", err);
                        EventOutcome::Ignored
                    }
                }
            }
            SessionEvent::LocationUpdate(fix) => {
                if self.location.update(fix) {
                    self.render();
                    EventOutcome::Updated
                } else {
                    EventOutcome::Ignored
                }
            }
        }
    }

    pub fn handle_completion(&mut self, completion: FetchCompletion) -> CompletionOutcome {
        let FetchCompletion {
            token,
            start,
            end,
            outcome,
        } = completion;

        if !self.admission.complete(token) {
            debug!("Session: discarding result of superseded fetch {}", token);
            return CompletionOutcome::Discarded;
        }

        if self.in_flight.as_ref().is_some_and(|f| f.token == token) {
            self.in_flight = None;
        }

        match outcome {
            Ok(route) => {
                let region = route
                    .bounding_box()
                    .and_then(|rect| CameraRegion::from_rect(rect, self.camera_padding));
                let distance = route.distance_label();
                let duration = route.duration_label();

                if !self.selection.set_result(start, end, route) {
                    debug!("Session: selection moved on, dropping route {}", token);
                    return CompletionOutcome::Discarded;
                }

                info!(
                    "Session: route {} -> {}: {}, {}",
                    start, end, distance, duration
                );

                if let Some(region) = region {
                    self.map_view.fit_camera(region);
                }
                self.render();
                CompletionOutcome::Applied
            }
            Err(err) if err.is_canceled() => CompletionOutcome::Discarded,
            Err(err) => {
                warn!("Session: fetch {} failed: {}", token, err);
                CompletionOutcome::Failed(err.kind())
            }
        }
    }

    /// Waits for the next spawned fetch to report and applies it.
    pub async fn next_completion(&mut self) -> Option<CompletionOutcome> {
        let completion = self.completion_rx.recv().await?;
        Some(self.handle_completion(completion))
    }

    /// Applies every completion that has already arrived, without waiting.
    pub fn process_ready_completions(&mut self) -> Vec<CompletionOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.completion_rx.try_recv() {
            outcomes.push(self.handle_completion(completion));
        }
        outcomes
    }

    /// Waits until the current fetch, if any, has been applied.
    pub async fn settle(&mut self) -> Vec<CompletionOutcome> {
        let mut outcomes = Vec::new();
        while self.has_fetch_in_flight() {
            match self.next_completion().await {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        outcomes
    }

    /// Processes external events and fetch completions until `events` closes,
    /// then hands back the map view.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) -> V {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event, Timestamp::now());
                    }
                    None => break,
                },
                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion);
                }
            }
        }

        self.into_map_view()
    }

    pub fn into_map_view(mut self) -> V {
        self.supersede_in_flight();
        self.map_view
    }

    fn request_route(&mut self, start: Coordinate, end: Coordinate, now: Timestamp) -> EventOutcome {
        if !self.client.has_credential() {
            if !self.credential_reported {
                error!("Session: no directions API credential configured, routes are disabled");
                self.credential_reported = true;
            }
            return EventOutcome::MissingCredential;
        }

        match self.admission.try_admit(now) {
            Decision::Admitted(token) => {
                self.cancel_in_flight();
                self.spawn_fetch(token, start, end);
                EventOutcome::FetchStarted(token)
            }
            rejected => {
                info!("Session: route request skipped ({:?})", rejected);
                EventOutcome::FetchRejected(rejected)
            }
        }
    }

    fn spawn_fetch(&mut self, token: RequestToken, start: Coordinate, end: Coordinate) {
        let client = Arc::clone(&self.client);
        let completion_tx = self.completion_tx.clone();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        debug!("Session: starting fetch {}", token);

        tokio::spawn(async move {
            let outcome = client.fetch_route(start, end, &task_cancel).await;
            // The session may already be gone.
            let _ = completion_tx.send(FetchCompletion {
                token,
                start,
                end,
                outcome,
            });
        });

        self.in_flight = Some(InFlightFetch { token, cancel });
    }

    fn cancel_in_flight(&mut self) {
        if let Some(fetch) = self.in_flight.take() {
            debug!("Session: canceling fetch {}", fetch.token);
            fetch.cancel.cancel();
        }
    }

    fn supersede_in_flight(&mut self) {
        self.admission.supersede();
        self.cancel_in_flight();
    }

    fn scene(&self) -> MapScene {
        let mut markers = Vec::with_capacity(2);
        if let Some(start) = self.selection.start() {
            markers.push(Marker {
                coordinate: start,
                role: MarkerRole::Start,
            });
        }
        if let Some(end) = self.selection.end() {
            markers.push(Marker {
                coordinate: end,
                role: MarkerRole::End,
            });
        }

        MapScene {
            markers,
            polyline: self
                .selection
                .result()
                .map(|route| route.polyline.clone())
                .unwrap_or_default(),
            user_location: self.location.current().map(|fix| fix.coordinate),
        }
    }

    fn render(&mut self) {
        let scene = self.scene();
        self.map_view.render(&scene);
    }
}
