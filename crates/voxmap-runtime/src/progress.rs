use std::time::Duration;

/// Receives coarse progress from long-running work.
pub trait ProgressMonitor {
    fn begin(&mut self, task: &str, total_work: Option<u64>);
    fn begin_subtask(&mut self, task: &str, subtask_work: Option<u64>);
    fn worked(&mut self, amount: u64);
    fn finished_subtask(&mut self);
    fn finished(&mut self);

    /// Polled between steps; returning true abandons the work.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Snapshot of a generation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    /// Candidate cells handed to workers so far.
    pub enumerated: u64,
    /// Candidates whose containment test has completed.
    pub checked: u64,
    /// Candidates found inside the solid.
    pub accepted: u64,
    /// Candidate cells in the whole volume.
    pub total: u64,
    pub elapsed: Duration,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            (self.checked as f64 / self.total as f64).min(1.0) as f32
        }
    }
}

/// Reports through `log`, at most once per task percent.
#[derive(Debug, Default)]
pub struct LogProgress {
    task: String,
    total: Option<u64>,
    done: u64,
    last_pct: Option<u64>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressMonitor for LogProgress {
    fn begin(&mut self, task: &str, total_work: Option<u64>) {
        self.task = task.to_string();
        self.total = total_work;
        self.done = 0;
        self.last_pct = None;
        match total_work {
            Some(t) => log::info!("{task}: {t} units of work"),
            None => log::info!("{task}"),
        }
    }

    fn begin_subtask(&mut self, task: &str, subtask_work: Option<u64>) {
        match subtask_work {
            Some(t) => log::info!("{}: {task} ({t})", self.task),
            None => log::info!("{}: {task}", self.task),
        }
    }

    fn worked(&mut self, amount: u64) {
        self.done += amount;
        let Some(total) = self.total.filter(|&t| t > 0) else {
            log::debug!("{}: {} done", self.task, self.done);
            return;
        };
        let pct = (self.done.min(total) * 100) / total;
        if self.last_pct != Some(pct) {
            self.last_pct = Some(pct);
            log::info!("{}: {pct}% ({}/{total})", self.task, self.done);
        }
    }

    fn finished_subtask(&mut self) {
        log::debug!("{}: subtask finished", self.task);
    }

    fn finished(&mut self) {
        log::info!("{}: finished", self.task);
    }
}
