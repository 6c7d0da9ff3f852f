//! Simulated event sources

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::debug;

use crate::domain::{ActivityKind, AuthorizationStatus, Coordinate, ScreenState};
use crate::error::{LocationError, ReminderResult};
use crate::sources::{
    AuthorizationSource, EventSink, LocationSource, LocationUpdate, MotionSource, MotionUpdate, ScreenStateQuery,
};

/// Currently registered delivery target
struct Target<T> {
    sink: Mutex<Option<EventSink<T>>>,
}

impl<T> Target<T> {
    fn new() -> Self {
        Self { sink: Mutex::new(None) }
    }

    fn replace(&self, sink: Option<EventSink<T>>) {
        if let Ok(mut slot) = self.sink.lock() {
            *slot = sink;
        }
    }

    fn get(&self) -> Option<EventSink<T>> {
        self.sink.lock().ok().and_then(|slot| slot.clone())
    }

    async fn deliver(&self, event: T, what: &str) {
        match self.get() {
            Some(sink) if sink.is_closed() => {
                debug!(what, generation = sink.generation(), "Coordinator gone, event dropped");
            }
            Some(sink) => {
                debug!(what, generation = sink.generation(), "Delivering event");
                if sink.send(event).await.is_err() {
                    debug!(what, "Coordinator gone, event dropped");
                }
            }
            None => debug!(what, "No subscriber, event dropped"),
        }
    }
}

/// Permission provider with a settable status
pub struct SimAuthorizationSource {
    status: Mutex<AuthorizationStatus>,
    target: Target<AuthorizationStatus>,
    grant_on_prompt: Mutex<Option<AuthorizationStatus>>,
    prompts: AtomicUsize,
    subscriptions: AtomicUsize,
}

impl SimAuthorizationSource {
    pub fn new(status: AuthorizationStatus) -> Self {
        Self {
            status: Mutex::new(status),
            target: Target::new(),
            grant_on_prompt: Mutex::new(None),
            prompts: AtomicUsize::new(0),
            subscriptions: AtomicUsize::new(0),
        }
    }

    /// Answer the system prompt with `status` when it is shown
    pub fn grant_on_prompt(&self, status: AuthorizationStatus) {
        if let Ok(mut grant) = self.grant_on_prompt.lock() {
            *grant = Some(status);
        }
    }

    /// Change the platform status and notify the subscriber, if any
    pub async fn set_status(&self, status: AuthorizationStatus) {
        debug!(%status, "SimAuthorizationSource::set_status: called");
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
        self.target.deliver(status, "authorization").await;
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

impl AuthorizationSource for SimAuthorizationSource {
    fn current(&self) -> AuthorizationStatus {
        self.status.lock().map(|status| *status).unwrap_or_default()
    }

    fn subscribe(&self, sink: EventSink<AuthorizationStatus>) {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        self.target.replace(Some(sink));
    }

    fn request_always_authorization(&self) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let grant = self.grant_on_prompt.lock().ok().and_then(|grant| *grant);
        if let Some(status) = grant {
            debug!(%status, "Simulated user answered the prompt");
            if let Ok(mut current) = self.status.lock() {
                *current = status;
            }
            if let Some(sink) = self.target.get() {
                let _ = sink.try_send(status);
            }
        }
    }
}

/// Location provider fed by the test or scenario
pub struct SimLocationSource {
    target: Target<LocationUpdate>,
    active: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl SimLocationSource {
    pub fn new() -> Self {
        Self {
            target: Target::new(),
            active: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Sink of the most recent subscription, kept after `stop()`
    pub fn last_sink(&self) -> Option<EventSink<LocationUpdate>> {
        self.target.get()
    }

    pub async fn emit_fix(&self, coordinate: Coordinate) {
        if self.is_active() {
            self.target.deliver(LocationUpdate::Fix(coordinate), "location").await;
        }
    }

    /// Report a provider failure; ends the subscription
    pub async fn emit_failure(&self, error: LocationError) {
        if self.is_active() {
            self.active.store(false, Ordering::SeqCst);
            self.target.deliver(LocationUpdate::Failed(error), "location").await;
        }
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Default for SimLocationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationSource for SimLocationSource {
    fn start(&self, sink: EventSink<LocationUpdate>) -> ReminderResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.target.replace(Some(sink));
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Activity classifier fed by the test or scenario
pub struct SimMotionSource {
    available: AtomicBool,
    target: Target<MotionUpdate>,
    active: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl SimMotionSource {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            target: Target::new(),
            active: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn last_sink(&self) -> Option<EventSink<MotionUpdate>> {
        self.target.get()
    }

    pub async fn emit(&self, kind: ActivityKind) {
        if self.is_active() {
            self.target.deliver(MotionUpdate::Classified(kind), "motion").await;
        }
    }

    /// Report that the classifier went away mid-stream
    pub async fn emit_unavailable(&self) {
        if self.is_active() {
            self.active.store(false, Ordering::SeqCst);
            self.target.deliver(MotionUpdate::Unavailable, "motion").await;
        }
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl MotionSource for SimMotionSource {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn start(&self, sink: EventSink<MotionUpdate>) -> ReminderResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.target.replace(Some(sink));
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Screen lock state the test flips by hand
#[derive(Debug, Default)]
pub struct SimScreen {
    locked: AtomicBool,
}

impl SimScreen {
    pub fn new(state: ScreenState) -> Self {
        Self {
            locked: AtomicBool::new(state == ScreenState::Locked),
        }
    }

    pub fn set(&self, state: ScreenState) {
        debug!(?state, "SimScreen::set: called");
        self.locked.store(state == ScreenState::Locked, Ordering::SeqCst);
    }
}

impl ScreenStateQuery for SimScreen {
    fn sample(&self) -> ScreenState {
        if self.locked.load(Ordering::SeqCst) {
            ScreenState::Locked
        } else {
            ScreenState::Unlocked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::ReminderRequest;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_location_emits_only_while_active() {
        let (tx, mut rx) = mpsc::channel(8);
        let source = SimLocationSource::new();

        source.emit_fix(Coordinate::new(1.0, 2.0)).await;
        assert!(rx.try_recv().is_err());

        source
            .start(EventSink::new(tx, 3, |generation, update| ReminderRequest::Location {
                generation,
                update,
            }))
            .unwrap();
        source.emit_fix(Coordinate::new(1.0, 2.0)).await;
        match rx.recv().await {
            Some(ReminderRequest::Location { generation, update }) => {
                assert_eq!(generation, 3);
                assert_eq!(update, LocationUpdate::Fix(Coordinate::new(1.0, 2.0)));
            }
            other => panic!("Expected location request, got {:?}", other),
        }

        source.stop();
        source.emit_fix(Coordinate::new(1.0, 2.0)).await;
        assert!(rx.try_recv().is_err());
        assert!(source.last_sink().is_some());
    }

    #[tokio::test]
    async fn test_prompt_grant_pushes_status() {
        let (tx, mut rx) = mpsc::channel(8);
        let source = SimAuthorizationSource::new(AuthorizationStatus::Undetermined);
        source.grant_on_prompt(AuthorizationStatus::AuthorizedAlways);
        source.subscribe(EventSink::new(tx, 1, |generation, status| ReminderRequest::Authorization {
            generation,
            status,
        }));

        source.request_always_authorization();
        assert_eq!(source.current(), AuthorizationStatus::AuthorizedAlways);
        assert!(matches!(
            rx.recv().await,
            Some(ReminderRequest::Authorization {
                status: AuthorizationStatus::AuthorizedAlways,
                ..
            })
        ));
    }

    #[test]
    fn test_screen_toggle() {
        let screen = SimScreen::new(ScreenState::Locked);
        assert_eq!(screen.sample(), ScreenState::Locked);
        screen.set(ScreenState::Unlocked);
        assert_eq!(screen.sample(), ScreenState::Unlocked);
    }
}
