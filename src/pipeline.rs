//! Sensor-to-label pipeline.
//!
//! [`HandednessPipeline`] owns the synchronous stages and a background inference worker:
//!
//! ```text
//!  sensor thread                         │  worker task (tokio)
//!  ───────────────────────────────────── │ ─────────────────────────────────────────
//!  SensorEvent ─► SampleClock ─► Sample  │
//!                 WindowedClassifier     │
//!                  └─ Window ──(queue)───┼─► spawn_blocking(classify) ─► results_tx
//! ```
//!
//! `ingest` never blocks or awaits, so it is safe to call from whatever thread delivers
//! sensor callbacks. Inference runs on the blocking pool via a single worker task, which
//! keeps results in window order. Each result carries its window sequence number.
//!
//! At most `max_pending_windows` windows may be queued or running at once. A window
//! produced past that limit is dropped and logged; its sequence number is still used, so
//! consumers see the gap.
//!
//! `stop` bumps a session generation. Work queued under an older generation is skipped
//! and any result it produces is discarded instead of delivered. The generation check and
//! the hand-off to the result channel happen under the same lock `stop` takes, so once
//! `stop` returns nothing more from that session enters the channel. Results already
//! buffered in the channel carry their [`ClassificationResult::generation`], which
//! consumers can compare against [`HandednessPipeline::generation`].

use crate::classifier::{ClassificationAdapter, ClassificationResult};
use crate::clock::SampleClock;
use crate::config::Settings;
use crate::error::{AppResult, HandednessError};
use crate::labels::LabelSet;
use crate::model::DenseModel;
use crate::sensor::SensorEvent;
use crate::window::{Window, WindowedClassifier};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Tunables for one pipeline instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Commit rate in Hz
    pub rate_hz: f64,
    /// Samples per window; must equal the model's input rows
    pub window_size: usize,
    /// Samples between windows
    pub stride: usize,
    /// Windows allowed queued or in flight before new ones are dropped
    pub max_pending_windows: usize,
    /// Capacity of the result channel
    pub result_capacity: usize,
}

impl PipelineOptions {
    /// Options from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            rate_hz: settings.sampling.rate_hz,
            window_size: settings.window.size,
            stride: settings.window.stride,
            max_pending_windows: settings.pipeline.max_pending_windows,
            result_capacity: settings.pipeline.result_capacity,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// What a single `ingest` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The pipeline is stopped; the event was ignored.
    Ignored,
    /// The event updated a reading but no sample was due.
    Observed,
    /// A sample was committed; no window was due.
    Committed,
    /// A window was produced and queued for inference.
    Queued(u64),
    /// A window was produced but dropped because inference is saturated.
    Dropped(u64),
}

/// Counters for one pipeline instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Events passed to `ingest` while running
    pub events: u64,
    /// Samples committed by the clock
    pub commits: u64,
    /// Windows queued for inference
    pub windows_queued: u64,
    /// Windows dropped by the overlap guard
    pub windows_dropped: u64,
}

impl PipelineStats {
    /// Counter deltas since `earlier`.
    pub fn since(&self, earlier: &PipelineStats) -> PipelineStats {
        PipelineStats {
            events: self.events - earlier.events,
            commits: self.commits - earlier.commits,
            windows_queued: self.windows_queued - earlier.windows_queued,
            windows_dropped: self.windows_dropped - earlier.windows_dropped,
        }
    }
}

struct InferenceJob {
    generation: u64,
    window: Window,
}

/// Session generation shared between the pipeline and its worker.
#[derive(Default)]
struct SessionGeneration {
    current: AtomicU64,
    delivery: Mutex<()>,
}

impl SessionGeneration {
    fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to the next generation; waits for an in-progress delivery to finish.
    fn advance(&self) -> u64 {
        let _delivery = self.lock();
        self.current.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Send `result` only if `generation` is still current.
    fn deliver(
        &self,
        generation: u64,
        permit: mpsc::Permit<'_, ClassificationResult>,
        result: ClassificationResult,
    ) -> bool {
        let _delivery = self.lock();
        if generation != self.current() {
            return false;
        }
        permit.send(result);
        true
    }
}

/// Real-time handedness classification pipeline.
pub struct HandednessPipeline {
    clock: SampleClock,
    windows: WindowedClassifier,
    running: bool,
    generation: Arc<SessionGeneration>,
    pending: Arc<AtomicUsize>,
    max_pending: usize,
    jobs: mpsc::UnboundedSender<InferenceJob>,
    worker: JoinHandle<()>,
    labels: LabelSet,
    stats: PipelineStats,
}

impl HandednessPipeline {
    /// Build a pipeline around an adapter and spawn its inference worker.
    ///
    /// Must be called from within a tokio runtime. Returns the pipeline and the receiver
    /// on which classification results arrive.
    pub fn spawn(
        adapter: ClassificationAdapter,
        options: PipelineOptions,
    ) -> AppResult<(Self, mpsc::Receiver<ClassificationResult>)> {
        if options.window_size != adapter.window_size() {
            return Err(HandednessError::Configuration(format!(
                "window size {} does not match model input rows {}",
                options.window_size,
                adapter.window_size()
            )));
        }
        if options.stride == 0 || options.max_pending_windows == 0 || options.result_capacity == 0
        {
            return Err(HandednessError::Configuration(
                "stride, max_pending_windows and result_capacity must be non-zero".into(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            HandednessError::Session(format!("pipeline needs a tokio runtime: {e}"))
        })?;

        let generation = Arc::new(SessionGeneration::default());
        let pending = Arc::new(AtomicUsize::new(0));
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::channel(options.result_capacity);
        let labels = adapter.labels().clone();

        let worker = runtime.spawn(run_worker(
            adapter,
            jobs_rx,
            results_tx,
            Arc::clone(&generation),
            Arc::clone(&pending),
        ));

        let pipeline = Self {
            clock: SampleClock::new(options.rate_hz),
            windows: WindowedClassifier::new(options.window_size, options.stride),
            running: false,
            generation,
            pending,
            max_pending: options.max_pending_windows,
            jobs: jobs_tx,
            worker,
            labels,
            stats: PipelineStats::default(),
        };
        Ok((pipeline, results_rx))
    }

    /// Load the model and label order named in `settings` and spawn a pipeline.
    ///
    /// A missing or corrupt model is an error. Missing or malformed label metadata is not:
    /// the default label order is used and a warning is logged.
    pub fn from_settings(
        settings: &Settings,
    ) -> AppResult<(Self, mpsc::Receiver<ClassificationResult>)> {
        settings.validate()?;
        let model = DenseModel::load(&settings.model.path)?;
        let labels = LabelSet::resolve_or_default(&settings.model.metadata_path);
        let adapter = ClassificationAdapter::new(Arc::new(model), labels)?;
        Self::spawn(adapter, PipelineOptions::from_settings(settings))
    }

    /// Begin a sensing session from a clean state. No-op if already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.clock.reset();
        self.windows.reset();
        self.running = true;
        info!(
            generation = self.generation.current(),
            interval_ns = self.clock.interval_ns(),
            window = self.windows.window_size(),
            stride = self.windows.stride(),
            "Sensing started"
        );
    }

    /// End the session: cancel outstanding inference delivery and clear all buffered
    /// state. No-op if not running.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        let generation = self.generation.advance();
        self.clock.reset();
        self.windows.reset();
        info!(generation, stats = ?self.stats, "Sensing stopped");
    }

    /// Whether a session is active.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Feed one raw sensor event. Never blocks.
    pub fn ingest(&mut self, event: &SensorEvent) -> IngestOutcome {
        if !self.running {
            return IngestOutcome::Ignored;
        }
        self.stats.events += 1;

        let Some(sample) = self.clock.observe(event) else {
            return IngestOutcome::Observed;
        };
        self.stats.commits += 1;

        let Some(window) = self.windows.ingest(sample) else {
            return IngestOutcome::Committed;
        };
        self.dispatch(window)
    }

    fn dispatch(&mut self, window: Window) -> IngestOutcome {
        let sequence = window.sequence();
        let in_flight = self.pending.load(Ordering::Acquire);
        if in_flight >= self.max_pending {
            self.stats.windows_dropped += 1;
            warn!(
                sequence,
                in_flight, "Inference still in flight, dropping window"
            );
            return IngestOutcome::Dropped(sequence);
        }

        self.pending.fetch_add(1, Ordering::AcqRel);
        let job = InferenceJob {
            generation: self.generation.current(),
            window,
        };
        if self.jobs.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            self.stats.windows_dropped += 1;
            error!(sequence, "Inference worker has exited, dropping window");
            return IngestOutcome::Dropped(sequence);
        }

        self.stats.windows_queued += 1;
        debug!(sequence, "Window queued for inference");
        IngestOutcome::Queued(sequence)
    }

    /// Current session generation. Incremented by every [`stop`](Self::stop).
    ///
    /// A result whose `generation` differs from this belongs to a stopped session.
    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    /// Resolved label order used by this pipeline.
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Running counters.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Live samples currently buffered for the next window.
    pub fn buffered_samples(&self) -> usize {
        self.windows.live_count()
    }

    /// Windows queued or being classified right now.
    pub fn pending_windows(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Stop sensing, let the worker drain, and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        let Self { jobs, worker, .. } = self;
        drop(jobs);
        if let Err(e) = worker.await {
            error!(error = %e, "Inference worker terminated abnormally");
        }
    }
}

async fn run_worker(
    adapter: ClassificationAdapter,
    mut jobs: mpsc::UnboundedReceiver<InferenceJob>,
    results: mpsc::Sender<ClassificationResult>,
    generation: Arc<SessionGeneration>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(job) = jobs.recv().await {
        let sequence = job.window.sequence();
        let outcome = if job.generation == generation.current() {
            let adapter = adapter.clone();
            let window = job.window;
            Some(tokio::task::spawn_blocking(move || adapter.classify(&window)).await)
        } else {
            debug!(sequence, "Skipping window from a stopped session");
            None
        };
        pending.fetch_sub(1, Ordering::AcqRel);

        let mut result = match outcome {
            Some(Ok(result)) => result,
            Some(Err(e)) => {
                error!(sequence, error = %e, "Inference failed");
                continue;
            }
            None => continue,
        };

        result.generation = job.generation;

        // Waits while the consumer is behind; `stop` may land during the wait
        let Ok(permit) = results.reserve().await else {
            debug!("Result receiver dropped, inference worker exiting");
            break;
        };
        if !generation.deliver(job.generation, permit, result) {
            debug!(sequence, "Discarding result from a stopped session");
        }
    }
    debug!("Inference worker finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSource;
    use crate::model::InferenceModel;
    use crate::sensor::CHANNEL_COUNT;
    use std::time::Duration;
    use tokio::time::timeout;

    /// Scores each class by the mean of one accelerometer axis.
    struct AxisModel {
        rows: usize,
    }

    impl InferenceModel for AxisModel {
        fn input_shape(&self) -> (usize, usize) {
            (self.rows, CHANNEL_COUNT)
        }

        fn output_len(&self) -> usize {
            3
        }

        fn infer(&self, input: &[f32]) -> Vec<f32> {
            (0..3)
                .map(|axis| {
                    input.iter().skip(axis).step_by(CHANNEL_COUNT).sum::<f32>() / self.rows as f32
                })
                .collect()
        }
    }

    fn options(rows: usize, stride: usize, max_pending: usize) -> PipelineOptions {
        PipelineOptions {
            rate_hz: 100.0,
            window_size: rows,
            stride,
            max_pending_windows: max_pending,
            result_capacity: 16,
        }
    }

    fn adapter(rows: usize) -> ClassificationAdapter {
        ClassificationAdapter::new(
            Arc::new(AxisModel { rows }),
            LabelSet::new(["BOTH", "LEFT", "RIGHT"], LabelSource::Metadata),
        )
        .unwrap()
    }

    /// One accelerometer event per 10 ms tick, so every event commits at 100 Hz.
    fn accel_tick(i: i64, values: [f32; 3]) -> SensorEvent {
        SensorEvent::accel(values, i * 10_000_000)
    }

    #[tokio::test]
    async fn test_ignored_until_started() {
        let (mut pipeline, _rx) = HandednessPipeline::spawn(adapter(4), options(4, 2, 1)).unwrap();
        assert_eq!(
            pipeline.ingest(&accel_tick(0, [1.0; 3])),
            IngestOutcome::Ignored
        );
        pipeline.start();
        assert_eq!(
            pipeline.ingest(&accel_tick(0, [1.0; 3])),
            IngestOutcome::Committed
        );
        assert_eq!(
            pipeline.ingest(&accel_tick(0, [1.0; 3])),
            IngestOutcome::Observed
        );
    }

    #[tokio::test]
    async fn test_result_delivered_with_label() {
        let (mut pipeline, mut rx) =
            HandednessPipeline::spawn(adapter(4), options(4, 2, 1)).unwrap();
        pipeline.start();
        let mut outcomes = Vec::new();
        for i in 0..4 {
            outcomes.push(pipeline.ingest(&accel_tick(i, [0.0, 0.0, 1.0])));
        }
        assert_eq!(outcomes[3], IngestOutcome::Queued(0));

        let result = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.sequence, 0);
        assert_eq!(result.label, "RIGHT");
        assert_eq!(result.best_index, Some(2));
        assert_eq!(result.confidences, vec![0.0, 0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_overlap_guard_drops_when_saturated() {
        let (mut pipeline, mut rx) =
            HandednessPipeline::spawn(adapter(2), options(2, 1, 1)).unwrap();
        pipeline.start();
        pipeline.ingest(&accel_tick(0, [1.0, 0.0, 0.0]));
        // Current-thread runtime: the worker cannot run until we yield, so the first
        // window is still pending when the next one is produced.
        assert_eq!(
            pipeline.ingest(&accel_tick(1, [1.0, 0.0, 0.0])),
            IngestOutcome::Queued(0)
        );
        assert_eq!(
            pipeline.ingest(&accel_tick(2, [1.0, 0.0, 0.0])),
            IngestOutcome::Dropped(1)
        );
        assert_eq!(pipeline.stats().windows_dropped, 1);

        let first = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(pipeline.pending_windows(), 0);

        assert_eq!(
            pipeline.ingest(&accel_tick(3, [0.0, 1.0, 0.0])),
            IngestOutcome::Queued(2)
        );
        let next = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.sequence, 2);
    }

    #[tokio::test]
    async fn test_results_in_window_order() {
        let (mut pipeline, mut rx) =
            HandednessPipeline::spawn(adapter(2), options(2, 1, 8)).unwrap();
        pipeline.start();
        for i in 0..6 {
            pipeline.ingest(&accel_tick(i, [i as f32, 0.0, 0.0]));
        }
        let mut sequences = Vec::new();
        for _ in 0..5 {
            let r = timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            sequences.push(r.sequence);
        }
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_stop_cancels_pending_delivery() {
        let (mut pipeline, mut rx) =
            HandednessPipeline::spawn(adapter(2), options(2, 1, 4)).unwrap();
        pipeline.start();
        for i in 0..3 {
            pipeline.ingest(&accel_tick(i, [1.0, 0.0, 0.0]));
        }
        // Two windows queued, worker has not run yet
        assert_eq!(pipeline.pending_windows(), 2);
        pipeline.stop();
        assert_eq!(pipeline.buffered_samples(), 0);

        // Nothing from the stopped session reaches the receiver
        assert!(timeout(Duration::from_millis(200), rx.recv()).await.is_err());
        assert_eq!(pipeline.pending_windows(), 0);

        // The next session starts clean and delivers normally
        pipeline.start();
        assert_eq!(
            pipeline.ingest(&accel_tick(100, [0.0, 1.0, 0.0])),
            IngestOutcome::Committed
        );
        assert!(matches!(
            pipeline.ingest(&accel_tick(101, [0.0, 1.0, 0.0])),
            IngestOutcome::Queued(_)
        ));
        let r = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(r.label, "LEFT");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_cancels_delivery_blocked_on_full_channel() {
        let options = PipelineOptions {
            result_capacity: 1,
            ..options(2, 1, 8)
        };
        let (mut pipeline, mut rx) = HandednessPipeline::spawn(adapter(2), options).unwrap();
        pipeline.start();
        for i in 0..4 {
            pipeline.ingest(&accel_tick(i, [1.0, 0.0, 0.0]));
        }

        // Window 0 fills the channel, window 1 finishes inference and waits for a slot
        timeout(Duration::from_secs(5), async {
            while pipeline.pending_windows() > 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        let stopped = pipeline.generation();
        pipeline.stop();
        assert_eq!(pipeline.generation(), stopped + 1);

        // Only the result buffered before stop is there, tagged with the old generation
        let buffered = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(buffered.sequence, 0);
        assert_eq!(buffered.generation, stopped);
        assert!(timeout(Duration::from_millis(300), rx.recv()).await.is_err());
        assert_eq!(pipeline.pending_windows(), 0);

        pipeline.start();
        pipeline.ingest(&accel_tick(100, [0.0, 1.0, 0.0]));
        pipeline.ingest(&accel_tick(101, [0.0, 1.0, 0.0]));
        let next = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.generation, pipeline.generation());
        assert_eq!(next.label, "LEFT");
    }

    #[tokio::test]
    async fn test_window_size_must_match_model() {
        let result = HandednessPipeline::spawn(adapter(4), options(8, 2, 1));
        assert!(matches!(result, Err(HandednessError::Configuration(_))));
    }

    #[test]
    fn test_spawn_outside_runtime_fails() {
        let result = HandednessPipeline::spawn(adapter(4), options(4, 2, 1));
        assert!(matches!(result, Err(HandednessError::Session(_))));
    }

    #[tokio::test]
    async fn test_shutdown_closes_results() {
        let (pipeline, mut rx) = HandednessPipeline::spawn(adapter(2), options(2, 1, 1)).unwrap();
        pipeline.shutdown().await;
        assert!(rx.recv().await.is_none());
    }
}
