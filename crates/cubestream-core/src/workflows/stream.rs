use crate::core::density::DensityNormalizer;
use crate::core::io::cube::CubeReadOptions;
use crate::core::models::snapshot::{AtomicSimulationSnapshot, VolumeGeometry};
use crate::core::sequence::{Sequencer, SnapshotPathPattern};
use crate::engine::cancel::CancellationToken;
use crate::engine::config::StreamConfig;
use crate::engine::error::StreamError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::publish::SnapshotCell;
use crate::engine::scene::{SceneBinding, SceneNode, scene_position};
use crate::engine::timeline::VolumeTimeline;
use nalgebra::Point3;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, instrument};

pub const PRODUCER_THREAD_NAME: &str = "cubestream-producer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    Idle,
    Running,
    Stopped,
}

impl StreamState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => StreamState::Idle,
            1 => StreamState::Running,
            _ => StreamState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            StreamState::Idle => 0,
            StreamState::Running => 1,
            StreamState::Stopped => 2,
        }
    }
}

/// Why the producer loop ended.
#[derive(Debug)]
pub enum StreamOutcome {
    Cancelled,
    Halted(StreamError),
}

impl StreamOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamOutcome::Cancelled)
    }

    pub fn error(&self) -> Option<&StreamError> {
        match self {
            StreamOutcome::Cancelled => None,
            StreamOutcome::Halted(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    pub frames_published: u64,
    pub frames_purged: u64,
    pub last_index: u64,
}

#[derive(Debug)]
struct SharedState {
    state: AtomicU8,
    frames_published: AtomicU64,
    frames_purged: AtomicU64,
    last_index: AtomicU64,
    snapshot: SnapshotCell<AtomicSimulationSnapshot>,
    scaling_factor: f64,
}

impl SharedState {
    fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: StreamState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

/// Consumer-side view of a stream. Cheap to clone; never blocks on the producer
/// beyond a pointer copy.
#[derive(Debug, Clone)]
pub struct StreamReader {
    shared: Arc<SharedState>,
}

impl StreamReader {
    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    /// The last fully published snapshot. After a halt this stays on the last
    /// good frame.
    pub fn snapshot(&self) -> Arc<AtomicSimulationSnapshot> {
        self.shared.snapshot.load()
    }

    /// Atom positions of the current snapshot, in scene units.
    pub fn scene_positions(&self) -> Vec<Point3<f32>> {
        let scaling = self.shared.scaling_factor;
        self.snapshot()
            .atomic_positions()
            .iter()
            .map(|p| scene_position(p, scaling))
            .collect()
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            frames_published: self.shared.frames_published.load(Ordering::Acquire),
            frames_purged: self.shared.frames_purged.load(Ordering::Acquire),
            last_index: self.shared.last_index.load(Ordering::Acquire),
        }
    }
}

/// Reads and quantizes the snapshot at `index` using the configured source.
pub fn load_snapshot(config: &StreamConfig, index: u64) -> Result<AtomicSimulationSnapshot, StreamError> {
    let path = config.source.path_pattern().path_for(index);
    AtomicSimulationSnapshot::load(&path, &config.source.read_options(), &config.normalizer())
        .map_err(|source| StreamError::Parse { path, source })
}

/// A snapshot stream bound to its scene nodes and volume timeline.
///
/// Construction publishes the initial snapshot as timepoint `"0"`; the loop then
/// continues from the index after it, appending one timepoint per snapshot with
/// monotonically increasing labels.
pub struct StreamSession {
    config: StreamConfig,
    sequencer: Sequencer,
    pattern: SnapshotPathPattern,
    read_options: CubeReadOptions,
    normalizer: DensityNormalizer,
    grid_dimensions: [usize; 3],
    scene: SceneBinding,
    timeline: Arc<dyn VolumeTimeline>,
    shared: Arc<SharedState>,
    token: CancellationToken,
    reporter: ProgressReporter<'static>,
    next_label: u64,
}

impl StreamSession {
    /// Loads the first snapshot, lets the host build its collaborators around it,
    /// and binds them into a session.
    ///
    /// `build` receives the initial snapshot and the fixed volume geometry and
    /// returns the volume timeline plus one scene node per atom.
    pub fn open<F>(config: StreamConfig, build: F) -> Result<Self, StreamError>
    where
        F: FnOnce(
            &AtomicSimulationSnapshot,
            &VolumeGeometry,
        ) -> (Arc<dyn VolumeTimeline>, Vec<Arc<dyn SceneNode>>),
    {
        let initial = load_snapshot(&config, config.source.first_index)?;
        let geometry = VolumeGeometry::from_snapshot(&initial, config.position_scaling_factor);
        let (timeline, nodes) = build(&initial, &geometry);
        Self::new(config, initial, timeline, nodes)
    }

    /// [`StreamSession::open`] with the configuration read from a TOML file.
    pub fn open_from_toml<F>(path: &Path, build: F) -> Result<Self, StreamError>
    where
        F: FnOnce(
            &AtomicSimulationSnapshot,
            &VolumeGeometry,
        ) -> (Arc<dyn VolumeTimeline>, Vec<Arc<dyn SceneNode>>),
    {
        let config = StreamConfig::from_toml_file(path)?;
        info!("Loaded stream configuration from '{}'.", path.display());
        Self::open(config, build)
    }

    pub fn new(
        config: StreamConfig,
        initial: AtomicSimulationSnapshot,
        timeline: Arc<dyn VolumeTimeline>,
        nodes: Vec<Arc<dyn SceneNode>>,
    ) -> Result<Self, StreamError> {
        let source = &config.source;
        let pattern = source.path_pattern();
        // The initial snapshot already covers `first_index`.
        let mut sequencer = source.sequencer();
        sequencer.next();
        let scene = SceneBinding::new(nodes, config.position_scaling_factor);
        scene.apply(&initial, &pattern.path_for(source.first_index))?;

        timeline.append_timepoint("0", initial.density().shared_levels());
        timeline.select_latest_timepoint()?;

        let shared = Arc::new(SharedState {
            state: AtomicU8::new(StreamState::Idle.as_u8()),
            frames_published: AtomicU64::new(1),
            frames_purged: AtomicU64::new(0),
            last_index: AtomicU64::new(source.first_index),
            scaling_factor: config.position_scaling_factor,
            snapshot: SnapshotCell::new(initial),
        });
        let grid_dimensions = shared.snapshot.load().grid_dimensions();

        Ok(Self {
            read_options: source.read_options(),
            normalizer: config.normalizer(),
            config,
            sequencer,
            pattern,
            grid_dimensions,
            scene,
            timeline,
            shared,
            token: CancellationToken::new(),
            reporter: ProgressReporter::new(),
            next_label: 1,
        })
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter<'static>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    pub fn reader(&self) -> StreamReader {
        StreamReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs one iteration: advance, parse, quantize, move scene nodes, append,
    /// select and purge. Returns the snapshot index that was published.
    ///
    /// Nothing is published when reading or validating the snapshot fails.
    pub fn step(&mut self) -> Result<u64, StreamError> {
        let index = self.sequencer.next();
        let path = self.pattern.path_for(index);
        debug!("Reading snapshot {} from '{}'.", index, path.display());

        let snapshot = AtomicSimulationSnapshot::load(&path, &self.read_options, &self.normalizer)
            .map_err(|source| StreamError::Parse {
                path: path.clone(),
                source,
            })?;
        self.validate(&snapshot, &path)?;

        self.scene.apply(&snapshot, &path)?;

        let label = self.next_label.to_string();
        self.next_label += 1;
        self.timeline
            .append_timepoint(&label, snapshot.density().shared_levels());
        self.timeline.select_latest_timepoint()?;
        let retention = self.config.retention;
        let purged = self
            .timeline
            .purge_oldest(retention.purge_batch_size, retention.purge_keep_minimum);

        self.shared.snapshot.publish(Arc::new(snapshot));
        self.shared.frames_published.fetch_add(1, Ordering::AcqRel);
        self.shared
            .frames_purged
            .fetch_add(purged as u64, Ordering::AcqRel);
        self.shared.last_index.store(index, Ordering::Release);

        self.reporter.report(Progress::FramePublished { index, label });
        if purged > 0 {
            debug!("Purged {} timepoint(s).", purged);
            self.reporter.report(Progress::FramesPurged { count: purged });
        }
        Ok(index)
    }

    fn validate(&self, snapshot: &AtomicSimulationSnapshot, path: &Path) -> Result<(), StreamError> {
        if snapshot.grid_dimensions() != self.grid_dimensions {
            return Err(StreamError::GridDimensionsChanged {
                path: PathBuf::from(path),
                expected: self.grid_dimensions,
                found: snapshot.grid_dimensions(),
            });
        }
        self.scene.check(snapshot, path)
    }

    /// Drives the loop on the calling thread until cancelled or a snapshot fails.
    #[instrument(skip_all, name = "snapshot_stream")]
    pub fn run(&mut self) -> StreamOutcome {
        if self.state() != StreamState::Idle {
            return StreamOutcome::Halted(StreamError::AlreadyStarted);
        }
        self.shared.set_state(StreamState::Running);
        info!(
            "Streaming snapshots {}..{} from '{}'.",
            self.sequencer.first_index(),
            self.sequencer.last_index_exclusive(),
            self.pattern.base_dir().display()
        );
        self.reporter.report(Progress::StreamStart {
            first_index: self.sequencer.current_index(),
        });

        let outcome = loop {
            if self.token.is_cancelled() {
                break StreamOutcome::Cancelled;
            }
            if let Err(e) = self.step() {
                error!("Snapshot stream halted: {}", e);
                self.reporter.report(Progress::Halted {
                    reason: e.to_string(),
                });
                break StreamOutcome::Halted(e);
            }
            if self.token.wait_timeout(self.config.inter_frame_delay) {
                break StreamOutcome::Cancelled;
            }
        };

        self.shared.set_state(StreamState::Stopped);
        self.reporter.report(Progress::StreamFinish);
        info!(
            "Snapshot stream stopped after {} frame(s).",
            self.shared.frames_published.load(Ordering::Acquire)
        );
        outcome
    }

    /// Moves the session onto its own producer thread.
    pub fn start(mut self) -> Result<StreamHandle, StreamError> {
        if self.state() != StreamState::Idle {
            return Err(StreamError::AlreadyStarted);
        }
        let reader = self.reader();
        let token = self.cancellation_token();
        let worker = thread::Builder::new()
            .name(PRODUCER_THREAD_NAME.to_string())
            .spawn(move || self.run())
            .map_err(StreamError::Spawn)?;
        Ok(StreamHandle {
            reader,
            token,
            worker,
        })
    }
}

/// Host-side handle to a running producer thread.
pub struct StreamHandle {
    reader: StreamReader,
    token: CancellationToken,
    worker: JoinHandle<StreamOutcome>,
}

impl StreamHandle {
    pub fn reader(&self) -> &StreamReader {
        &self.reader
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Waits for the producer to end on its own.
    pub fn join(self) -> Result<StreamOutcome, StreamError> {
        self.worker.join().map_err(|_| StreamError::WorkerPanicked)
    }

    /// Cancels the producer and waits for it to exit.
    pub fn stop(self) -> Result<StreamOutcome, StreamError> {
        self.cancel();
        self.join()
    }
}
