//! Parallel grid generation: fills a voxel grid from a point-in-solid test.
#![forbid(unsafe_code)]

mod progress;

pub use progress::{LogProgress, Progress, ProgressMonitor};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;
use voxmap_geom::{IVec3, Vec3};
use voxmap_grid::{VoxelGrid, VoxelId};

/// Point-containment test run on worker threads.
pub type ContainsFn = Arc<dyn Fn(Vec3) -> bool + Send + Sync>;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid generation parameters: {0}")]
    InvalidParams(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to spawn producer thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("generation cancelled")]
    Cancelled,
    #[error("containment test panicked on a worker thread")]
    WorkerPanicked,
}

#[derive(Clone, Debug)]
pub struct GenerationParams {
    /// World-space lower corner of the candidate volume.
    pub min: Vec3,
    /// World-space upper corner of the candidate volume.
    pub max: Vec3,
    pub voxel_size: f32,
    pub voxel_id: VoxelId,
    pub workers: usize,
    pub queue_capacity: usize,
    /// Wall time the consumer spends per step in [`GridGeneration::run`].
    pub yield_interval: Duration,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
            voxel_size: 1.0,
            voxel_id: 1,
            workers: 5,
            queue_capacity: 4096,
            yield_interval: Duration::from_millis(100),
        }
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<(), GenerateError> {
        let bad = |m: String| Err(GenerateError::InvalidParams(m));
        if !(self.voxel_size.is_finite() && self.voxel_size > 0.0) {
            return bad(format!("voxel_size must be positive, got {}", self.voxel_size));
        }
        if self.voxel_id <= 0 {
            return bad(format!("voxel_id must be positive, got {}", self.voxel_id));
        }
        if self.workers == 0 {
            return bad("workers must be at least 1".into());
        }
        if self.queue_capacity == 0 {
            return bad("queue_capacity must be at least 1".into());
        }
        let finite = |v: Vec3| v.x.is_finite() && v.y.is_finite() && v.z.is_finite();
        if !finite(self.min) || !finite(self.max) {
            return bad("bounds must be finite".into());
        }
        if self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z {
            return bad(format!("min {:?} exceeds max {:?}", self.min, self.max));
        }
        Ok(())
    }

    /// Grid offset in cells: the first cell sits at or above `min` on every axis.
    pub fn offset(&self) -> IVec3 {
        let s = self.voxel_size;
        IVec3::new(
            (self.min.x / s).ceil() as i32,
            (self.min.y / s).ceil() as i32,
            (self.min.z / s).ceil() as i32,
        )
    }

    /// Candidate cells per axis; every candidate's world point lies within `max`.
    pub fn extent(&self) -> (usize, usize, usize) {
        let s = self.voxel_size;
        let off = self.offset();
        let axis = |max: f32, off: i32| ((max / s).floor() as i64 - off as i64 + 1).max(0) as usize;
        (
            axis(self.max.x, off.x),
            axis(self.max.y, off.y),
            axis(self.max.z, off.z),
        )
    }

    pub fn candidate_count(&self) -> u64 {
        let (x, y, z) = self.extent();
        x as u64 * y as u64 * z as u64
    }

    /// World point tested for `cell`.
    #[inline]
    pub fn world_point(&self, cell: IVec3) -> Vec3 {
        (cell + self.offset()).to_vec3() * self.voxel_size
    }
}

struct StopOnPanic(Arc<AtomicBool>);

impl Drop for StopOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Release);
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    enumerated: AtomicU64,
    checked: AtomicU64,
    accepted: AtomicU64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Pending(Progress),
    Finished(Progress),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Running,
    Finished,
    Cancelled,
}

/// A generation run in flight. The producer and the workers run on their own
/// threads; only [`step`](Self::step) writes to the grid.
pub struct GridGeneration {
    params: GenerationParams,
    grid: VoxelGrid,
    accepted_rx: Option<Receiver<IVec3>>,
    cancel: Arc<AtomicBool>,
    counters: Arc<Counters>,
    producer: Option<JoinHandle<()>>,
    _pool: Arc<ThreadPool>,
    total: u64,
    started: Instant,
    state: State,
}

impl GridGeneration {
    pub fn start(params: GenerationParams, contains: ContainsFn) -> Result<Self, GenerateError> {
        params.validate()?;
        let (nx, ny, nz) = params.extent();
        let total = params.candidate_count();
        let offset = params.offset();
        log::info!(
            "generating {nx}x{ny}x{nz} candidates ({total}) at voxel size {} with {} workers",
            params.voxel_size,
            params.workers
        );

        let mut grid = VoxelGrid::with_dimensions(nx, ny, nz);
        grid.set_scale(params.voxel_size);
        grid.set_offset(offset);

        let cancel = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());
        let (cand_tx, cand_rx) = bounded::<IVec3>(params.queue_capacity);
        let (acc_tx, acc_rx) = bounded::<IVec3>(params.queue_capacity);

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(params.workers)
                .thread_name(|i| format!("voxmap-gen-{i}"))
                .panic_handler({
                    let cancel = cancel.clone();
                    move |_| {
                        log::error!("containment test panicked; stopping generation");
                        cancel.store(true, Ordering::Relaxed);
                    }
                })
                .build()?,
        );
        for _ in 0..params.workers {
            let rx = cand_rx.clone();
            let tx = acc_tx.clone();
            let cancel = cancel.clone();
            let counters = counters.clone();
            let contains = contains.clone();
            let size = params.voxel_size;
            pool.spawn(move || {
                let (rx, tx) = (rx, tx);
                // Drops before the channel ends, so the flag is set by the
                // time the consumer sees them disconnect.
                let _stop = StopOnPanic(cancel.clone());
                while let Ok(cell) = rx.recv() {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let inside = contains((cell + offset).to_vec3() * size);
                    counters.checked.fetch_add(1, Ordering::Relaxed);
                    if inside {
                        counters.accepted.fetch_add(1, Ordering::Relaxed);
                        if tx.send(cell).is_err() {
                            break;
                        }
                    }
                }
            });
        }
        drop(cand_rx);
        drop(acc_tx);

        let producer = {
            let cancel = cancel.clone();
            let counters = counters.clone();
            thread::Builder::new()
                .name("voxmap-gen-producer".into())
                .spawn(move || {
                    'enumerate: for k in 0..nz {
                        for j in 0..ny {
                            for i in 0..nx {
                                if cancel.load(Ordering::Relaxed) {
                                    break 'enumerate;
                                }
                                let cell = IVec3::new(i as i32, j as i32, k as i32);
                                if cand_tx.send(cell).is_err() {
                                    break 'enumerate;
                                }
                                counters.enumerated.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    log::debug!(
                        "producer done after {} candidates",
                        counters.enumerated.load(Ordering::Relaxed)
                    );
                })?
        };

        Ok(Self {
            params,
            grid,
            accepted_rx: Some(acc_rx),
            cancel,
            counters,
            producer: Some(producer),
            _pool: pool,
            total,
            started: Instant::now(),
            state: State::Running,
        })
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// The grid as filled so far.
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn progress(&self) -> Progress {
        Progress {
            enumerated: self.counters.enumerated.load(Ordering::Relaxed),
            checked: self.counters.checked.load(Ordering::Relaxed),
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            total: self.total,
            elapsed: self.started.elapsed(),
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state == State::Cancelled
    }

    /// Drains accepted cells into the grid for at most `budget`. A budget too
    /// large to represent as a deadline drains until the run ends.
    ///
    /// If a containment test panicked, the run ends cancelled: the step
    /// reports `Finished` and [`is_cancelled`](Self::is_cancelled) is true.
    pub fn step(&mut self, budget: Duration) -> Step {
        let deadline = Instant::now().checked_add(budget);
        let Some(rx) = self.accepted_rx.as_ref() else {
            return Step::Finished(self.progress());
        };
        let id = self.params.voxel_id;
        loop {
            let received = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Step::Pending(self.progress());
                    }
                    rx.recv_timeout(deadline - now)
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(cell) => {
                    if let Err(e) = self.grid.set_at(cell, id) {
                        log::warn!("dropping accepted cell: {e}");
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Step::Pending(self.progress()),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if self.cancel.load(Ordering::Acquire) {
            self.cancel();
            return Step::Finished(self.progress());
        }
        self.accepted_rx = None;
        self.join_producer();
        self.state = State::Finished;
        let p = self.progress();
        log::info!(
            "generation finished: {} of {} candidates inside, {} voxels in {:.2?}",
            p.accepted,
            p.total,
            self.grid.count(),
            p.elapsed
        );
        Step::Finished(p)
    }

    /// Steps until done, yielding to `monitor` between steps.
    pub fn run(&mut self, monitor: &mut dyn ProgressMonitor) -> Result<Progress, GenerateError> {
        monitor.begin("generating voxel grid", Some(self.total));
        monitor.begin_subtask("testing candidates", Some(self.total));
        let mut reported = 0u64;
        let interval = self.params.yield_interval;
        loop {
            let step = self.step(interval);
            let p = match step {
                Step::Pending(p) | Step::Finished(p) => p,
            };
            if p.checked > reported {
                monitor.worked(p.checked - reported);
                reported = p.checked;
            }
            if let Step::Finished(p) = step {
                monitor.finished_subtask();
                monitor.finished();
                if self.is_cancelled() {
                    return Err(GenerateError::WorkerPanicked);
                }
                return Ok(p);
            }
            if monitor.is_cancelled() {
                self.cancel();
                monitor.finished();
                return Err(GenerateError::Cancelled);
            }
        }
    }

    /// Stops the producer and workers and discards the partial grid.
    pub fn cancel(&mut self) {
        if self.state != State::Running {
            return;
        }
        self.cancel.store(true, Ordering::Relaxed);
        self.accepted_rx = None;
        self.join_producer();
        self.grid = VoxelGrid::new();
        self.state = State::Cancelled;
        log::info!("generation cancelled");
    }

    /// The finished grid; `None` unless the run completed.
    pub fn into_grid(mut self) -> Option<VoxelGrid> {
        (self.state == State::Finished).then(|| std::mem::take(&mut self.grid))
    }

    fn join_producer(&mut self) {
        if let Some(handle) = self.producer.take() {
            if handle.join().is_err() {
                log::error!("generation producer panicked");
            }
        }
    }
}

impl Drop for GridGeneration {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs a generation to completion on the calling thread.
pub fn generate(
    params: GenerationParams,
    contains: ContainsFn,
    monitor: &mut dyn ProgressMonitor,
) -> Result<VoxelGrid, GenerateError> {
    let mut run = GridGeneration::start(params, contains)?;
    run.run(monitor)?;
    run.into_grid().ok_or(GenerateError::Cancelled)
}
