//! Reconciliation state machine.
//!
//! One task owns the snapshot, the [`AudioController`], the [`PlayScheduler`]
//! and every timer. Everything that can change them (remote events, local
//! intents, connection signals, load completions, timer firings, audio
//! notices) is an [`EngineInput`] on a single unbounded inbox and is applied
//! strictly in receipt order. Slow work (opening a URL, waiting for a start
//! instant, retry backoff) runs in spawned tasks that post a
//! generation-stamped input back when done, so the inbox never blocks.
//!
//! The UI reads a [`SnapshotView`] published through a `watch` channel after
//! every input.
//!
//! # Track change vs play-state change
//!
//! An event is a track change iff its track identity differs from the loaded
//! one (or the loaded one is in error with no retry pending). Anything else is
//! a play-state change and never reloads audio.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use super::latency_registry::LatencyRegistry;
use super::load_retry::{LoadRetryPolicy, RetryDecision};
use super::play_scheduler::{PendingScheduledAction, PlayScheduler, ScheduleOutcome};
use crate::audio::{
    AudioBackend, AudioController, AudioError, AudioNotice, AudioOutput, AudioResult,
    AudioSessionHandle, AudioState, LoadOutcome,
};
use crate::error::{SyncError, SyncResult};
use crate::events::{ConnectionEvent, EventEmitter, PlaybackEvent};
use crate::lifecycle::{
    ConnectionLifecycle, ConnectionSignal, ConnectionState, ConnectionTracker,
    ConnectionTransition,
};
use crate::protocol::{OutboundIntent, RemoteEvent};
use crate::runtime::TaskSpawner;
use crate::state::EngineConfig;
use crate::transport::TransportSink;
use crate::types::{PlaybackSnapshot, TrackRef};
use crate::utils::{clamp_position, now_millis, Clock};

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Machine state as seen by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SyncState {
    #[default]
    Idle,
    /// Opening a track, or waiting out a retry backoff.
    Loading,
    Playing,
    Paused,
    /// The track failed to load and no retry is left.
    Error {
        #[serde(rename = "trackId")]
        track_id: String,
    },
}

/// Intents originating from local UI controls.
///
/// These only ever produce outbound intents; local audio follows when the
/// authority echoes the change back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalIntent {
    TogglePlayPause,
    Next,
    Previous,
    Seek(f64),
}

/// Read-only view published after every engine input.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    pub snapshot: PlaybackSnapshot,
    pub state: SyncState,
    pub connection: ConnectionState,
    /// True once the authority has been unreachable for `stale_after_secs`.
    pub stale: bool,
    pub audio: AudioSessionHandle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_start: Option<PendingScheduledAction>,
}

/// Everything the engine talks to.
pub struct EngineDeps {
    pub backend: Arc<dyn AudioBackend>,
    pub transport: Arc<dyn TransportSink>,
    pub emitter: Arc<dyn EventEmitter>,
    pub latency: Arc<LatencyRegistry>,
    pub clock: Arc<dyn Clock>,
    pub spawner: Arc<dyn TaskSpawner>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbox
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) enum EngineInput {
    Remote(RemoteEvent),
    Local(LocalIntent),
    Connection(ConnectionSignal),
    LoadFinished {
        generation: u64,
        result: AudioResult<Box<dyn AudioOutput>>,
    },
    Audio {
        generation: u64,
        notice: AudioNotice,
    },
    ScheduledFire {
        generation: u64,
    },
    RetryDue {
        generation: u64,
    },
    StaleDue {
        epoch: u64,
    },
    Shutdown(oneshot::Sender<()>),
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Cloneable handle to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineInput>,
    view: watch::Receiver<SnapshotView>,
}

impl EngineHandle {
    fn post(&self, input: EngineInput) -> SyncResult<()> {
        self.tx.send(input).map_err(|_| SyncError::EngineStopped)
    }

    /// Asks the authority to toggle play/pause based on the last snapshot.
    pub fn toggle_play_pause(&self) -> SyncResult<()> {
        self.post(EngineInput::Local(LocalIntent::TogglePlayPause))
    }

    pub fn next(&self) -> SyncResult<()> {
        self.post(EngineInput::Local(LocalIntent::Next))
    }

    pub fn previous(&self) -> SyncResult<()> {
        self.post(EngineInput::Local(LocalIntent::Previous))
    }

    /// Asks the authority to seek. Negative positions are clamped to 0.
    pub fn seek(&self, position_secs: f64) -> SyncResult<()> {
        self.post(EngineInput::Local(LocalIntent::Seek(position_secs)))
    }

    /// The most recently published view.
    #[must_use]
    pub fn snapshot(&self) -> SnapshotView {
        self.view.borrow().clone()
    }

    /// Subscribes to view updates.
    pub fn subscribe(&self) -> watch::Receiver<SnapshotView> {
        self.view.clone()
    }

    /// Stops the engine, releasing the audio resource. Idempotent.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.post(EngineInput::Shutdown(reply)).is_ok() {
            let _ = done.await;
        }
    }
}

impl ConnectionLifecycle for EngineHandle {
    fn on_connected(&self) {
        if self
            .post(EngineInput::Connection(ConnectionSignal::Connected))
            .is_err()
        {
            log::debug!("[SyncEngine] Connected signal after shutdown");
        }
    }

    fn on_disconnected(&self, reason: Option<String>) {
        if self
            .post(EngineInput::Connection(ConnectionSignal::Disconnected {
                reason,
            }))
            .is_err()
        {
            log::debug!("[SyncEngine] Disconnected signal after shutdown");
        }
    }

    fn on_event(&self, name: &str, payload: serde_json::Value) -> SyncResult<()> {
        let event = RemoteEvent::from_wire(name, payload)?;
        self.post(EngineInput::Remote(event))
    }
}

/// Starts the engine task and returns its handle.
///
/// The task runs until [`EngineHandle::shutdown`] or until `cancel_token`
/// fires.
pub fn spawn_engine(
    config: EngineConfig,
    deps: EngineDeps,
    cancel_token: CancellationToken,
) -> EngineHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (view_tx, view_rx) = watch::channel(SnapshotView::default());
    let spawner = Arc::clone(&deps.spawner);

    let engine = SyncEngine::new(config, deps, tx.clone(), view_tx);
    spawner.spawn(Box::pin(engine.run(rx, cancel_token)));

    EngineHandle { tx, view: view_rx }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Failed load waiting out its backoff.
struct PendingRetry {
    generation: u64,
    track: TrackRef,
    position: f64,
    play: bool,
    token: CancellationToken,
}

struct SyncEngine {
    config: EngineConfig,
    snapshot: PlaybackSnapshot,
    controller: AudioController,
    scheduler: PlayScheduler,
    retry_policy: LoadRetryPolicy,
    retry: Option<PendingRetry>,
    retry_generation: u64,
    /// Retries already spent on the current track.
    retries_spent: u32,
    connection: ConnectionTracker,
    stale: bool,
    stale_epoch: u64,
    stale_timer: Option<CancellationToken>,
    completed_generation: Option<u64>,
    state: SyncState,
    latency: Arc<LatencyRegistry>,
    transport: Arc<dyn TransportSink>,
    emitter: Arc<dyn EventEmitter>,
    spawner: Arc<dyn TaskSpawner>,
    inbox: mpsc::UnboundedSender<EngineInput>,
    view_tx: watch::Sender<SnapshotView>,
}

impl SyncEngine {
    fn new(
        config: EngineConfig,
        deps: EngineDeps,
        inbox: mpsc::UnboundedSender<EngineInput>,
        view_tx: watch::Sender<SnapshotView>,
    ) -> Self {
        let notice_tx = inbox.clone();
        let controller = AudioController::new(
            deps.backend,
            Arc::new(move |generation: u64, notice: AudioNotice| {
                let _ = notice_tx.send(EngineInput::Audio { generation, notice });
            }),
        );

        let fire_tx = inbox.clone();
        let scheduler = PlayScheduler::new(
            deps.clock,
            Arc::clone(&deps.spawner),
            Arc::new(move |generation: u64| {
                let _ = fire_tx.send(EngineInput::ScheduledFire { generation });
            }),
        );

        Self {
            retry_policy: LoadRetryPolicy::from_config(&config),
            config,
            snapshot: PlaybackSnapshot::default(),
            controller,
            scheduler,
            retry: None,
            retry_generation: 0,
            retries_spent: 0,
            connection: ConnectionTracker::default(),
            stale: false,
            stale_epoch: 0,
            stale_timer: None,
            completed_generation: None,
            state: SyncState::Idle,
            latency: deps.latency,
            transport: deps.transport,
            emitter: deps.emitter,
            spawner: deps.spawner,
            inbox,
            view_tx,
        }
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<EngineInput>,
        cancel_token: CancellationToken,
    ) {
        log::info!("[SyncEngine] Started");
        loop {
            let input = tokio::select! {
                _ = cancel_token.cancelled() => break,
                input = rx.recv() => input,
            };
            match input {
                Some(EngineInput::Shutdown(reply)) => {
                    self.teardown().await;
                    let _ = reply.send(());
                    log::info!("[SyncEngine] Stopped");
                    return;
                }
                Some(input) => {
                    self.handle(input).await;
                    self.publish();
                }
                None => break,
            }
        }
        self.teardown().await;
        log::info!("[SyncEngine] Stopped");
    }

    async fn handle(&mut self, input: EngineInput) {
        match input {
            EngineInput::Remote(event) => self.on_remote(event).await,
            EngineInput::Local(intent) => self.on_local(intent),
            EngineInput::Connection(signal) => self.on_connection(signal),
            EngineInput::LoadFinished { generation, result } => {
                self.on_load_finished(generation, result).await
            }
            EngineInput::Audio { generation, notice } => self.on_audio(generation, notice).await,
            EngineInput::ScheduledFire { generation } => {
                if self.scheduler.take_due(generation).is_some() {
                    log::info!("[SyncEngine] Scheduled start firing (gen={})", generation);
                    self.apply_play_state(true).await;
                }
            }
            EngineInput::RetryDue { generation } => self.on_retry_due(generation).await,
            EngineInput::StaleDue { epoch } => self.on_stale_due(epoch),
            EngineInput::Shutdown(_) => {}
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Remote events
    // ─────────────────────────────────────────────────────────────────────

    async fn on_remote(&mut self, event: RemoteEvent) {
        if self.connection.state() != ConnectionState::Connected {
            log::debug!(
                "[SyncEngine] Dropping {} while {:?}",
                event.name(),
                self.connection.state()
            );
            return;
        }
        log::debug!("[SyncEngine] <- {}", event.name());

        match event {
            RemoteEvent::FullSnapshot(snapshot) => self.on_full_snapshot(snapshot).await,
            RemoteEvent::TrackChanged {
                track,
                position,
                is_playing,
            } => {
                let position = clamp_position(position, None);
                self.scheduler.cancel();
                self.snapshot.set_track(Some(track.clone()));
                self.snapshot.position = position;
                self.snapshot.is_playing = is_playing;
                if self.is_track_change(&track) {
                    self.load_track(track, position, is_playing).await;
                } else {
                    self.correct_drift(position).await;
                    self.apply_play_state(is_playing).await;
                }
            }
            RemoteEvent::SyncPlay {
                track,
                position,
                start_time_ms,
            } => {
                let position = clamp_position(position, None);
                self.snapshot.set_track(Some(track.clone()));
                self.snapshot.position = position;
                self.snapshot.is_playing = true;
                if self.is_track_change(&track) {
                    // Loaded paused; the scheduler issues the start.
                    self.load_track(track, position, false).await;
                } else {
                    self.correct_drift(position).await;
                }
                let zone_delay = self
                    .latency
                    .compensation_ms(self.config.output_zone.as_deref());
                if let ScheduleOutcome::Immediate { .. } =
                    self.scheduler.schedule(start_time_ms, zone_delay)
                {
                    self.apply_play_state(true).await;
                }
            }
            RemoteEvent::SyncPause { position } => {
                let position = clamp_position(position, None);
                self.scheduler.cancel();
                self.snapshot.position = position;
                self.snapshot.is_playing = false;
                // Audio keeps the position captured by the pause.
                if let Some(retry) = self.retry.as_mut() {
                    retry.position = position;
                }
                self.apply_play_state(false).await;
            }
            RemoteEvent::SyncSeek { position, track } => {
                let position = clamp_position(position, None);
                match track {
                    Some(track) if self.is_track_change(&track) => {
                        self.snapshot.set_track(Some(track.clone()));
                        self.snapshot.position = position;
                        if self.should_load(self.snapshot.is_playing) {
                            self.scheduler.cancel();
                            let playing = self.snapshot.is_playing;
                            self.load_track(track, position, playing).await;
                        }
                    }
                    other => {
                        if let Some(track) = other {
                            self.snapshot.set_track(Some(track));
                        }
                        self.snapshot.position = position;
                        self.seek_to(position, 0.0).await;
                    }
                }
            }
            RemoteEvent::PositionTick {
                track,
                position,
                is_playing,
            } => self.snapshot.apply_tick(track, position, is_playing),
        }
    }

    async fn on_full_snapshot(&mut self, snapshot: PlaybackSnapshot) {
        self.scheduler.cancel();
        self.stale = false;
        self.snapshot = snapshot;
        self.snapshot.position = clamp_position(self.snapshot.position, None);

        let Some(track) = self.snapshot.track.clone() else {
            self.cancel_retry();
            if self.controller.loaded_track().is_some() {
                log::info!("[SyncEngine] Snapshot has no track, stopping");
                self.controller.stop().await;
            }
            return;
        };

        let position = self.snapshot.position;
        let playing = self.snapshot.is_playing;
        if self.is_track_change(&track) {
            if self.should_load(playing) {
                self.load_track(track, position, playing).await;
            }
        } else {
            self.correct_drift(position).await;
            self.apply_play_state(playing).await;
        }
    }

    /// Key rule: only a different identity (or a dead resource) reloads.
    fn is_track_change(&self, incoming: &TrackRef) -> bool {
        match self.controller.loaded_track() {
            None => true,
            Some(loaded) if !loaded.same_identity(incoming) => true,
            Some(_) => self.controller.session().state == AudioState::Error && self.retry.is_none(),
        }
    }

    /// Audio is created lazily: nothing is opened for a paused authority
    /// unless something is already loaded.
    fn should_load(&self, playing: bool) -> bool {
        playing || self.controller.loaded_track().is_some()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Local intents
    // ─────────────────────────────────────────────────────────────────────

    fn on_local(&mut self, intent: LocalIntent) {
        let outbound = match intent {
            LocalIntent::TogglePlayPause if self.snapshot.is_playing => OutboundIntent::Pause,
            LocalIntent::TogglePlayPause => OutboundIntent::Play,
            LocalIntent::Next => OutboundIntent::NextTrack,
            LocalIntent::Previous => OutboundIntent::PreviousTrack,
            LocalIntent::Seek(position) => OutboundIntent::Seek {
                position: clamp_position(position, None),
            },
        };
        log::debug!("[SyncEngine] -> {}", outbound.name());
        self.transport.send(outbound);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connection
    // ─────────────────────────────────────────────────────────────────────

    fn on_connection(&mut self, signal: ConnectionSignal) {
        let Some(transition) = self.connection.observe(signal) else {
            return;
        };
        let timestamp = now_millis();
        match transition {
            ConnectionTransition::Connected => {
                log::info!("[SyncEngine] Connected");
                self.emitter
                    .emit_connection(ConnectionEvent::Connected { timestamp });
            }
            ConnectionTransition::Reconnected => {
                log::info!("[SyncEngine] Reconnected, awaiting snapshot");
                self.disarm_stale_timer();
                self.emitter
                    .emit_connection(ConnectionEvent::Reconnected { timestamp });
            }
            ConnectionTransition::Lost { reason } => {
                log::warn!(
                    "[SyncEngine] Connection lost ({}), holding playback",
                    reason.as_deref().unwrap_or("no reason")
                );
                self.scheduler.cancel();
                self.cancel_retry();
                self.arm_stale_timer();
                self.emitter
                    .emit_connection(ConnectionEvent::Disconnected { reason, timestamp });
            }
        }
    }

    fn arm_stale_timer(&mut self) {
        self.disarm_stale_timer();
        self.stale_epoch += 1;
        let epoch = self.stale_epoch;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.inbox.clone();
        let after = Duration::from_secs(self.config.stale_after_secs);
        self.spawner.spawn(Box::pin(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let _ = tx.send(EngineInput::StaleDue { epoch });
                }
            }
        }));
        self.stale_timer = Some(token);
    }

    fn disarm_stale_timer(&mut self) {
        if let Some(token) = self.stale_timer.take() {
            token.cancel();
        }
    }

    fn on_stale_due(&mut self, epoch: u64) {
        if epoch != self.stale_epoch || self.connection.state() != ConnectionState::Holding {
            return;
        }
        self.stale_timer = None;
        if !self.stale {
            log::info!(
                "[SyncEngine] No authority for {}s, snapshot is stale",
                self.config.stale_after_secs
            );
            self.stale = true;
            self.emitter.emit_connection(ConnectionEvent::SnapshotStale {
                timestamp: now_millis(),
            });
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Loading and retry
    // ─────────────────────────────────────────────────────────────────────

    /// Fresh load of a (new) track. Resets the retry budget.
    async fn load_track(&mut self, track: TrackRef, position: f64, play: bool) {
        self.cancel_retry();
        self.retries_spent = 0;
        self.start_load(track, position, play).await;
    }

    async fn start_load(&mut self, track: TrackRef, position: f64, play: bool) {
        match self.controller.load(track.clone(), position, play).await {
            Ok(ticket) => {
                let generation = ticket.generation;
                let open = ticket.open;
                let tx = self.inbox.clone();
                self.spawner.spawn(Box::pin(async move {
                    let result = open.await;
                    if tx
                        .send(EngineInput::LoadFinished { generation, result })
                        .is_err()
                    {
                        log::debug!("[SyncEngine] Load finished after shutdown (gen={})", generation);
                    }
                }));
            }
            Err(error) => self.on_load_failed(track, position, play, error),
        }
    }

    async fn on_load_finished(&mut self, generation: u64, result: AudioResult<Box<dyn AudioOutput>>) {
        match self.controller.complete_load(generation, result).await {
            LoadOutcome::Ready { track, playing } => {
                log::info!(
                    "[SyncEngine] {} loaded ({})",
                    track.id,
                    if playing { "playing" } else { "paused" }
                );
            }
            LoadOutcome::Failed {
                track,
                start_position,
                play,
                error,
            } => self.on_load_failed(track, start_position, play, error),
            LoadOutcome::Stale => {
                log::debug!("[SyncEngine] Dropped stale load completion (gen={})", generation);
            }
        }
    }

    fn on_load_failed(&mut self, track: TrackRef, position: f64, play: bool, error: AudioError) {
        let decision = self.retry_policy.decide(&track, &error, self.retries_spent);
        let will_retry = matches!(decision, RetryDecision::RetryAfter(_));
        log::warn!(
            "[SyncEngine] Load of {} failed: {} ({})",
            track.id,
            error,
            if will_retry { "will retry" } else { "giving up" }
        );
        self.emitter.emit_playback(PlaybackEvent::LoadFailed {
            track_id: track.id.clone(),
            message: error.to_string(),
            will_retry,
            timestamp: now_millis(),
        });

        if let RetryDecision::RetryAfter(delay) = decision {
            self.retries_spent += 1;
            self.retry_generation += 1;
            let generation = self.retry_generation;
            let token = CancellationToken::new();
            let cancelled = token.clone();
            let tx = self.inbox.clone();
            self.spawner.spawn(Box::pin(async move {
                tokio::select! {
                    _ = cancelled.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {
                        let _ = tx.send(EngineInput::RetryDue { generation });
                    }
                }
            }));
            self.retry = Some(PendingRetry {
                generation,
                track,
                position,
                play,
                token,
            });
        }
    }

    async fn on_retry_due(&mut self, generation: u64) {
        match self.retry.take() {
            Some(retry) if retry.generation == generation => {
                log::info!(
                    "[SyncEngine] Retrying {} (attempt {})",
                    retry.track.id,
                    self.retries_spent + 1
                );
                self.start_load(retry.track, retry.position, retry.play).await;
            }
            other => {
                self.retry = other;
                log::debug!("[SyncEngine] Dropping stale retry (gen={})", generation);
            }
        }
    }

    fn cancel_retry(&mut self) {
        if let Some(retry) = self.retry.take() {
            retry.token.cancel();
            log::debug!("[SyncEngine] Cancelled retry of {}", retry.track.id);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Audio control
    // ─────────────────────────────────────────────────────────────────────

    async fn apply_play_state(&mut self, play: bool) {
        if let Some(retry) = self.retry.as_mut() {
            retry.play = play;
            return;
        }
        let result = if play {
            self.controller.play().await
        } else {
            self.controller.pause().await
        };
        if let Err(e) = result {
            log::warn!(
                "[SyncEngine] {} failed: {}",
                if play { "Play" } else { "Pause" },
                e
            );
        }
    }

    /// Seeks if the local position deviates from `target` by more than `tolerance_secs`.
    async fn seek_to(&mut self, target: f64, tolerance_secs: f64) {
        if let Some(retry) = self.retry.as_mut() {
            retry.position = clamp_position(target, None);
            return;
        }
        match self.controller.session().state {
            AudioState::Loading => {}
            AudioState::Playing | AudioState::Paused => {
                if (self.controller.position() - target).abs() <= tolerance_secs {
                    return;
                }
            }
            AudioState::Idle | AudioState::Error => return,
        }
        if let Err(e) = self.controller.seek(target).await {
            log::warn!("[SyncEngine] Seek to {:.2}s failed: {}", target, e);
        }
    }

    /// Same-track reconciliation: only audible drift is corrected.
    async fn correct_drift(&mut self, target: f64) {
        let tolerance = self.config.drift_tolerance_ms as f64 / 1000.0;
        self.seek_to(target, tolerance).await;
    }

    async fn on_audio(&mut self, generation: u64, notice: AudioNotice) {
        match notice {
            AudioNotice::Finished => {
                if self.completed_generation == Some(generation) {
                    return;
                }
                let Some(track) = self.controller.mark_finished(generation) else {
                    log::debug!("[SyncEngine] Ignoring stale end of track (gen={})", generation);
                    return;
                };
                self.completed_generation = Some(generation);
                log::info!("[SyncEngine] {} finished", track.id);
                self.transport.send(OutboundIntent::TrackCompleted {
                    track_id: track.id.clone(),
                });
                self.emitter.emit_playback(PlaybackEvent::TrackCompleted {
                    track_id: track.id,
                    timestamp: now_millis(),
                });
            }
            AudioNotice::Failed(message) => {
                if let Some(track) = self.controller.mark_failed(generation).await {
                    log::warn!("[SyncEngine] {} failed during playback: {}", track.id, message);
                    self.emitter.emit_playback(PlaybackEvent::LoadFailed {
                        track_id: track.id,
                        message,
                        will_retry: false,
                        timestamp: now_millis(),
                    });
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // View
    // ─────────────────────────────────────────────────────────────────────

    fn derived_state(&self) -> SyncState {
        if self.retry.is_some() {
            return SyncState::Loading;
        }
        let session = self.controller.session();
        match session.state {
            AudioState::Idle => SyncState::Idle,
            AudioState::Loading => SyncState::Loading,
            AudioState::Playing => SyncState::Playing,
            AudioState::Paused => SyncState::Paused,
            AudioState::Error => SyncState::Error {
                track_id: session.loaded_track_id.clone().unwrap_or_default(),
            },
        }
    }

    fn publish(&mut self) {
        let state = self.derived_state();
        if state != self.state {
            log::info!("[SyncEngine] {:?} -> {:?}", self.state, state);
            self.state = state.clone();
            self.emitter.emit_playback(PlaybackEvent::StateChanged {
                state,
                track_id: self.controller.session().loaded_track_id.clone(),
                timestamp: now_millis(),
            });
        }

        self.view_tx.send_replace(SnapshotView {
            snapshot: self.snapshot.clone(),
            state: self.state.clone(),
            connection: self.connection.state(),
            stale: self.stale,
            audio: self.controller.session().clone(),
            pending_start: self.scheduler.pending().cloned(),
        });
    }

    async fn teardown(&mut self) {
        self.scheduler.cancel();
        self.cancel_retry();
        self.disarm_stale_timer();
        self.controller.stop().await;
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_support::{AudioCall, RecordingBackend};
    use crate::events::{LatencyEvent, NoopEventEmitter};
    use crate::runtime::TokioSpawner;
    use crate::transport::recording::RecordingTransport;
    use crate::protocol_constants::RESUME_POSITION_EPSILON_SECS;
    use crate::utils::ManualClock;
    use parking_lot::Mutex;
    use serde_json::json;

    const NOW: u64 = 1_700_000_000_000;

    #[derive(Default)]
    struct EventCapture {
        playback: Mutex<Vec<PlaybackEvent>>,
        connection: Mutex<Vec<ConnectionEvent>>,
    }

    impl EventEmitter for EventCapture {
        fn emit_playback(&self, event: PlaybackEvent) {
            self.playback.lock().push(event);
        }
        fn emit_connection(&self, event: ConnectionEvent) {
            self.connection.lock().push(event);
        }
        fn emit_latency(&self, _event: LatencyEvent) {}
    }

    struct Harness {
        handle: EngineHandle,
        backend: RecordingBackend,
        transport: RecordingTransport,
        events: Arc<EventCapture>,
        latency: Arc<LatencyRegistry>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(EngineConfig {
                output_zone: Some("kitchen".into()),
                ..Default::default()
            })
        }

        fn with_config(config: EngineConfig) -> Self {
            let backend = RecordingBackend::new();
            let transport = RecordingTransport::default();
            let events = Arc::new(EventCapture::default());
            let latency = Arc::new(LatencyRegistry::new(Arc::new(NoopEventEmitter)));
            let handle = spawn_engine(
                config,
                EngineDeps {
                    backend: Arc::new(backend.clone()),
                    transport: Arc::new(transport.clone()),
                    emitter: events.clone(),
                    latency: Arc::clone(&latency),
                    clock: Arc::new(ManualClock::at(NOW)),
                    spawner: Arc::new(TokioSpawner::current()),
                },
                CancellationToken::new(),
            );
            Self {
                handle,
                backend,
                transport,
                events,
                latency,
            }
        }

        async fn connected() -> Self {
            let h = Self::new();
            h.handle.on_connected();
            settle().await;
            h
        }

        async fn send(&self, name: &str, payload: serde_json::Value) {
            self.handle.on_event(name, payload).unwrap();
            settle().await;
        }

        fn view(&self) -> SnapshotView {
            self.handle.snapshot()
        }
    }

    /// Lets the engine task and any spawned load tasks run to quiescence.
    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    fn track_json(id: &str) -> serde_json::Value {
        json!({"id": id, "name": id.to_uppercase(), "resolvedUrl": format!("http://srv/{id}")})
    }

    fn streaming_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": id.to_uppercase(),
            "sourceKind": "streaming-full",
            "resolvedUrl": format!("https://cdn/{id}")
        })
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_while_playing_loads_and_plays() {
        let h = Harness::connected().await;

        h.send(
            "playback_state",
            json!({"track": track_json("a"), "isPlaying": true, "position": 7.0}),
        )
        .await;

        assert_eq!(
            h.backend.calls(),
            vec![
                AudioCall::Open("http://srv/a".into()),
                AudioCall::Seek(7.0),
                AudioCall::Play
            ]
        );
        let view = h.view();
        assert_eq!(view.state, SyncState::Playing);
        assert_eq!(view.audio.loaded_track_id.as_deref(), Some("a"));
        assert_eq!(view.connection, ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_snapshot_with_nothing_loaded_stays_idle() {
        let h = Harness::connected().await;

        h.send(
            "playback_state",
            json!({"track": track_json("a"), "isPlaying": false, "position": 20.0}),
        )
        .await;

        assert!(h.backend.calls().is_empty());
        assert_eq!(h.view().state, SyncState::Idle);
        assert_eq!(h.view().snapshot.track_id(), Some("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn same_track_play_state_change_never_reloads() {
        let h = Harness::connected().await;
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;

        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": false}))
            .await;
        h.send(
            "sync_play",
            json!({"track": track_json("a"), "position": 0.0, "startTime": NOW - 10}),
        )
        .await;
        h.send(
            "playback_state",
            json!({"track": track_json("a"), "isPlaying": true}),
        )
        .await;

        assert_eq!(h.backend.opens(), 1);
        assert_eq!(h.backend.plays(), 2);
        assert_eq!(h.backend.pauses(), 1);
        assert_eq!(h.view().state, SyncState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn re_resolved_url_is_not_a_track_change() {
        let h = Harness::connected().await;
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;

        h.send(
            "sync_seek",
            json!({"position": 30.0, "track": {"id": "a", "name": "A", "resolvedUrl": "http://mirror/a"}}),
        )
        .await;

        assert_eq!(h.backend.opens(), 1);
        assert_eq!(h.backend.seeks(), vec![30.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_play_fires_early_by_zone_delay() {
        let h = Harness::connected().await;
        h.latency.set_delay("kitchen", 250).unwrap();

        h.send(
            "sync_play",
            json!({"track": track_json("a"), "position": 0.0, "startTime": NOW + 5000}),
        )
        .await;

        // Loaded paused, start pending.
        assert_eq!(h.backend.opens(), 1);
        assert_eq!(h.backend.plays(), 0);
        assert_eq!(h.view().pending_start.unwrap().fire_at_ms, NOW + 4750);

        tokio::time::sleep(Duration::from_millis(4749)).await;
        settle().await;
        assert_eq!(h.backend.plays(), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(h.backend.plays(), 1);
        assert_eq!(h.view().state, SyncState::Playing);
        assert!(h.view().pending_start.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn inactive_zone_is_not_compensated() {
        let h = Harness::connected().await;
        h.latency.set_delay("kitchen", 250).unwrap();
        h.latency.set_active("kitchen", false).unwrap();

        h.send(
            "sync_play",
            json!({"track": track_json("a"), "position": 0.0, "startTime": NOW + 1000}),
        )
        .await;

        assert_eq!(h.view().pending_start.unwrap().fire_at_ms, NOW + 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn second_sync_play_supersedes_first() {
        let h = Harness::connected().await;

        h.send(
            "sync_play",
            json!({"track": track_json("a"), "position": 0.0, "startTime": NOW + 3000}),
        )
        .await;
        h.send(
            "sync_play",
            json!({"track": track_json("a"), "position": 0.0, "startTime": NOW + 4000}),
        )
        .await;

        tokio::time::sleep(Duration::from_millis(3500)).await;
        settle().await;
        assert_eq!(h.backend.plays(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(h.backend.plays(), 1);
        assert_eq!(h.backend.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_then_resume_keeps_position() {
        let h = Harness::connected().await;
        h.send(
            "sync_play",
            json!({"track": track_json("a"), "position": 0.0, "startTime": NOW}),
        )
        .await;

        h.backend.set_position(42.0);
        h.send("sync_pause", json!({"position": 42.0})).await;
        assert_eq!(h.view().audio.pause_position_seconds, 42.0);

        h.backend.set_position(42.8);
        h.send(
            "sync_play",
            json!({"track": track_json("a"), "position": 42.0, "startTime": NOW}),
        )
        .await;

        assert_eq!(h.view().state, SyncState::Playing);
        assert!((h.backend.seeks().last().copied().unwrap() - 42.0).abs() < RESUME_POSITION_EPSILON_SECS);
        assert_eq!(h.backend.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn five_step_reconnect_scenario() {
        let h = Harness::connected().await;

        // 1. Queue without a current track: nothing happens.
        h.send(
            "playback_state",
            json!({
                "track": null,
                "isPlaying": false,
                "queue": [track_json("a"), track_json("b")],
                "currentIndex": -1
            }),
        )
        .await;
        assert!(h.backend.calls().is_empty());
        assert_eq!(h.view().state, SyncState::Idle);
        assert_eq!(h.view().snapshot.queue.len(), 2);
        assert!(h.events.playback.lock().is_empty());

        // 2. Track change to A while playing.
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;
        assert_eq!(
            h.backend.calls(),
            vec![AudioCall::Open("http://srv/a".into()), AudioCall::Play]
        );
        assert_eq!(h.view().state, SyncState::Playing);
        assert_eq!(h.view().snapshot.current_index, 0);
        h.backend.clear_calls();

        // 3. Authoritative pause at 12s.
        h.backend.set_position(12.0);
        h.send("sync_pause", json!({"position": 12.0})).await;
        assert_eq!(h.backend.calls(), vec![AudioCall::Pause]);
        assert_eq!(h.view().state, SyncState::Paused);
        assert_eq!(h.view().audio.pause_position_seconds, 12.0);
        h.backend.clear_calls();

        // 4. Seek within the same track while paused.
        h.send(
            "sync_seek",
            json!({"position": 30.0, "track": track_json("a")}),
        )
        .await;
        assert_eq!(h.backend.calls(), vec![AudioCall::Seek(30.0)]);
        assert_eq!(h.view().audio.pause_position_seconds, 30.0);
        assert_eq!(h.view().snapshot.position, 30.0);
        h.backend.clear_calls();

        // 5. Connection lost: nothing is stopped or cleared.
        h.handle.on_disconnected(Some("network".into()));
        settle().await;
        assert!(h.backend.calls().is_empty());
        let view = h.view();
        assert_eq!(view.connection, ConnectionState::Holding);
        assert_eq!(view.state, SyncState::Paused);
        assert_eq!(view.snapshot.track_id(), Some("a"));

        // Reconnect with a snapshot naming B: authoritative track change.
        h.handle.on_connected();
        h.send(
            "playback_state",
            json!({"track": track_json("b"), "isPlaying": true, "position": 3.0}),
        )
        .await;

        assert_eq!(
            h.backend.calls(),
            vec![
                AudioCall::Release,
                AudioCall::Open("http://srv/b".into()),
                AudioCall::Seek(3.0),
                AudioCall::Play
            ]
        );
        let view = h.view();
        assert_eq!(view.connection, ConnectionState::Connected);
        assert_eq!(view.state, SyncState::Playing);
        assert_eq!(view.audio.loaded_track_id.as_deref(), Some("b"));
        assert_eq!(h.backend.live_resources(), 1);
        let kinds: Vec<&str> = h
            .events
            .connection
            .lock()
            .iter()
            .map(|e| match e {
                ConnectionEvent::Connected { .. } => "connected",
                ConnectionEvent::Reconnected { .. } => "reconnected",
                ConnectionEvent::Disconnected { .. } => "disconnected",
                ConnectionEvent::SnapshotStale { .. } => "stale",
            })
            .collect();
        assert_eq!(kinds, vec!["connected", "disconnected", "reconnected"]);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_pause_only_pauses_at_local_position() {
        let h = Harness::connected().await;
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;
        h.backend.clear_calls();

        h.backend.set_position(11.4);
        h.send("sync_pause", json!({"position": 12.0})).await;

        assert_eq!(h.backend.calls(), vec![AudioCall::Pause]);
        let view = h.view();
        assert_eq!(view.audio.pause_position_seconds, 11.4);
        assert_eq!(view.snapshot.position, 12.0);
        assert!(!view.snapshot.is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_positions_are_clamped_in_the_view() {
        let h = Harness::connected().await;

        h.send(
            "track_changed",
            json!({"track": track_json("a"), "isPlaying": false, "position": -4.0}),
        )
        .await;
        assert_eq!(h.view().snapshot.position, 0.0);

        h.send("sync_pause", json!({"position": -1.0})).await;
        assert_eq!(h.view().snapshot.position, 0.0);

        h.send("sync_seek", json!({"position": -9.5})).await;
        assert_eq!(h.view().snapshot.position, 0.0);
        assert!(h.backend.seeks().iter().all(|p| *p >= 0.0));

        h.send(
            "playback_state",
            json!({"track": track_json("a"), "isPlaying": false, "position": -2.0}),
        )
        .await;
        assert_eq!(h.view().snapshot.position, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn local_file_load_is_retried_once_after_backoff() {
        let h = Harness::connected().await;
        h.backend.fail_next_opens("http://srv/a", 1);

        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;
        assert_eq!(h.backend.opens(), 1);
        assert_eq!(h.view().state, SyncState::Loading);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        settle().await;
        assert_eq!(h.backend.opens(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(h.backend.opens(), 2);
        assert_eq!(h.view().state, SyncState::Playing);

        let failures: Vec<bool> = h
            .events
            .playback
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::LoadFailed { will_retry, .. } => Some(*will_retry),
                _ => None,
            })
            .collect();
        assert_eq!(failures, vec![true]);
    }

    #[tokio::test(start_paused = true)]
    async fn local_file_gives_up_after_single_retry() {
        let h = Harness::connected().await;
        h.backend.fail_next_opens("http://srv/a", 5);

        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;

        assert_eq!(h.backend.opens(), 2);
        assert_eq!(
            h.view().state,
            SyncState::Error {
                track_id: "a".into()
            }
        );
        assert_eq!(h.view().snapshot.track_id(), Some("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn streaming_load_is_never_retried() {
        let h = Harness::connected().await;
        h.backend.fail_next_opens("https://cdn/s", 1);

        h.send("track_changed", json!({"track": streaming_json("s"), "isPlaying": true}))
            .await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;

        assert_eq!(h.backend.opens(), 1);
        assert_eq!(
            h.view().state,
            SyncState::Error {
                track_id: "s".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn errored_track_reloads_when_named_again() {
        let h = Harness::connected().await;
        h.backend.fail_next_opens("https://cdn/s", 1);
        h.send("track_changed", json!({"track": streaming_json("s"), "isPlaying": true}))
            .await;

        h.send(
            "playback_state",
            json!({"track": streaming_json("s"), "isPlaying": true}),
        )
        .await;

        assert_eq!(h.backend.opens(), 2);
        assert_eq!(h.view().state, SyncState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn unresolved_url_fails_without_touching_backend() {
        let h = Harness::connected().await;

        h.send(
            "track_changed",
            json!({"track": {"id": "a", "name": "A", "resolvedUrl": ""}, "isPlaying": true}),
        )
        .await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;

        assert!(h.backend.calls().is_empty());
        assert_eq!(
            h.view().state,
            SyncState::Error {
                track_id: "a".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_load_is_released_on_arrival() {
        let h = Harness::connected().await;
        h.backend.set_open_delay(Duration::from_millis(100));

        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;
        h.send("track_changed", json!({"track": track_json("b"), "isPlaying": true}))
            .await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;

        assert_eq!(h.backend.opens(), 2);
        assert_eq!(h.backend.releases(), 1);
        assert_eq!(h.backend.live_resources(), 1);
        assert_eq!(h.backend.plays(), 1);
        assert_eq!(h.view().audio.loaded_track_id.as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn live_resources_never_exceed_one() {
        let h = Harness::connected().await;
        let ids = ["a", "b", "a", "c", "c", "b"];

        for (i, id) in ids.iter().enumerate() {
            if i % 2 == 0 {
                h.send("track_changed", json!({"track": track_json(id), "isPlaying": true}))
                    .await;
            } else {
                h.send(
                    "sync_play",
                    json!({"track": track_json(id), "position": 1.0, "startTime": NOW + 500}),
                )
                .await;
            }
            assert!(h.backend.live_resources() <= 1);
        }
        h.send("playback_state", json!({"track": null})).await;

        assert_eq!(h.backend.live_resources(), 0);
        assert_eq!(h.view().state, SyncState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn track_completed_is_sent_once_per_load() {
        let h = Harness::connected().await;
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;

        let notifier = h.backend.last_notifier().unwrap();
        notifier.finished();
        notifier.finished();
        settle().await;

        assert_eq!(
            h.transport.sent(),
            vec![OutboundIntent::TrackCompleted {
                track_id: "a".into()
            }]
        );
        assert_eq!(h.view().state, SyncState::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn end_notice_from_replaced_load_is_ignored() {
        let h = Harness::connected().await;
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;
        let old = h.backend.last_notifier().unwrap();
        h.send("track_changed", json!({"track": track_json("b"), "isPlaying": true}))
            .await;

        old.finished();
        settle().await;

        assert!(h.transport.sent().is_empty());
        assert_eq!(h.view().state, SyncState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_start() {
        let h = Harness::connected().await;
        h.send(
            "sync_play",
            json!({"track": track_json("a"), "position": 0.0, "startTime": NOW + 5000}),
        )
        .await;

        h.handle.on_disconnected(None);
        settle().await;
        assert!(h.view().pending_start.is_none());

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(h.backend.plays(), 0);
        assert_eq!(h.backend.releases(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_pause_cancels_pending_start() {
        let h = Harness::connected().await;
        h.send(
            "sync_play",
            json!({"track": track_json("a"), "position": 0.0, "startTime": NOW + 2000}),
        )
        .await;
        h.send("sync_pause", json!({"position": 0.0})).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;

        assert_eq!(h.backend.plays(), 0);
        assert_eq!(h.view().state, SyncState::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_flagged_stale_after_holding_too_long() {
        let h = Harness::connected().await;
        h.handle.on_disconnected(None);
        settle().await;

        tokio::time::sleep(Duration::from_secs(29)).await;
        settle().await;
        assert!(!h.view().stale);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert!(h.view().stale);

        h.handle.on_connected();
        h.send("playback_state", json!({"track": null})).await;
        assert!(!h.view().stale);
    }

    #[tokio::test(start_paused = true)]
    async fn position_tick_has_no_audio_side_effects() {
        let h = Harness::connected().await;
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;
        h.backend.clear_calls();

        h.send(
            "position_update",
            json!({"track": track_json("b"), "position": 99.0, "isPlaying": false}),
        )
        .await;

        assert!(h.backend.calls().is_empty());
        let view = h.view();
        assert_eq!(view.snapshot.position, 99.0);
        assert!(!view.snapshot.is_playing);
        assert_eq!(view.snapshot.track_id(), Some("b"));
        assert_eq!(view.state, SyncState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn local_intents_only_go_to_transport() {
        let h = Harness::connected().await;
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;
        h.backend.clear_calls();

        h.handle.toggle_play_pause().unwrap();
        h.handle.next().unwrap();
        h.handle.previous().unwrap();
        h.handle.seek(-5.0).unwrap();
        settle().await;

        assert!(h.backend.calls().is_empty());
        assert_eq!(
            h.transport.sent(),
            vec![
                OutboundIntent::Pause,
                OutboundIntent::NextTrack,
                OutboundIntent::PreviousTrack,
                OutboundIntent::Seek { position: 0.0 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn events_before_connect_are_dropped() {
        let h = Harness::new();
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;

        assert!(h.backend.calls().is_empty());
        assert!(h.view().snapshot.track.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_event_is_rejected_at_the_handle() {
        let h = Harness::connected().await;
        let err = h.handle.on_event("volume_changed", json!({})).unwrap_err();
        assert!(matches!(err, SyncError::UnknownEvent(name) if name == "volume_changed"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_audio_and_rejects_input() {
        let h = Harness::connected().await;
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;

        h.handle.shutdown().await;
        settle().await;

        assert_eq!(h.backend.live_resources(), 0);
        assert!(matches!(h.handle.next(), Err(SyncError::EngineStopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn state_changes_are_emitted_to_ui() {
        let h = Harness::connected().await;
        h.send("track_changed", json!({"track": track_json("a"), "isPlaying": true}))
            .await;

        let states: Vec<SyncState> = h
            .events
            .playback
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::StateChanged { state, .. } => Some(state.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![SyncState::Loading, SyncState::Playing]);
    }
}
