//! Cooperative periodic executive.
//!
//! Every task is a state machine with a `step`. A tick resumes each task
//! whose release time has come, exactly once, highest priority first and in
//! registration order among equal priorities. Steps never overlap and never
//! preempt each other.
//!
//! A task that falls more than one period behind does not catch up: its
//! missed releases are dropped and counted as overruns.

use heapless::Vec;

use crate::error::TaskFault;

/// Upper bound on registered tasks.
pub const MAX_TASKS: usize = 8;

/// Resumable step logic registered with the [`Scheduler`].
pub trait Task {
    /// Run one logical cycle; returns the state tag reached.
    fn step(&mut self, now_ms: u64) -> Result<&'static str, TaskFault>;

    /// Force outputs to a safe state. Called on executive shutdown.
    fn shutdown(&mut self) {}
}

/// Static task metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub struct TaskSpec {
    pub name: &'static str,
    pub priority: u8,
    pub period_ms: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub struct TaskStats {
    pub runs: u32,
    /// Releases skipped because the task ran late.
    pub overruns: u32,
    pub last_state: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub enum SchedulerError {
    Full,
    ZeroPeriod,
}

/// A task step failed; every task has already been shut down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "stm32", derive(defmt::Format))]
pub struct TaskFailure {
    pub task: &'static str,
    pub fault: TaskFault,
}

struct Slot<'a> {
    spec: TaskSpec,
    task: &'a mut dyn Task,
    next_release_ms: Option<u64>,
    stats: TaskStats,
}

pub struct Scheduler<'a, const N: usize = MAX_TASKS> {
    slots: Vec<Slot<'a>, N>,
    halted: bool,
}

impl<'a, const N: usize> Scheduler<'a, N> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            halted: false,
        }
    }

    /// Add a task. Its first release is the first tick after registration.
    pub fn register(&mut self, spec: TaskSpec, task: &'a mut dyn Task) -> Result<(), SchedulerError> {
        if spec.period_ms == 0 {
            return Err(SchedulerError::ZeroPeriod);
        }
        let slot = Slot {
            spec,
            task,
            next_release_ms: None,
            stats: TaskStats::default(),
        };
        // Keep slots ordered by priority; equal priorities stay in registration order.
        let index = self
            .slots
            .iter()
            .position(|s| s.spec.priority < spec.priority)
            .unwrap_or(self.slots.len());
        self.slots.insert(index, slot).map_err(|_| SchedulerError::Full)?;
        log_debug!("registered task {} p{} every {} ms", spec.name, spec.priority, spec.period_ms);
        Ok(())
    }

    /// Resume every due task once. Returns how many ran.
    pub fn tick(&mut self, now_ms: u64) -> Result<usize, TaskFailure> {
        if self.halted {
            return Ok(0);
        }

        let mut ran = 0;
        for i in 0..self.slots.len() {
            let slot = &mut self.slots[i];
            let release = *slot.next_release_ms.get_or_insert(now_ms);
            if now_ms < release {
                continue;
            }

            let period = slot.spec.period_ms as u64;
            let behind = (now_ms - release) / period;
            slot.stats.overruns += behind as u32;
            slot.next_release_ms = Some(release + (behind + 1) * period);

            match slot.task.step(now_ms) {
                Ok(state) => {
                    slot.stats.runs += 1;
                    slot.stats.last_state = state;
                    ran += 1;
                }
                Err(fault) => {
                    let task = slot.spec.name;
                    log_error!("task {} failed: {:?}", task, fault);
                    self.shutdown();
                    return Err(TaskFailure { task, fault });
                }
            }
        }
        Ok(ran)
    }

    /// Shut every task down and stop releasing steps.
    pub fn shutdown(&mut self) {
        if self.halted {
            return;
        }
        log_error!("scheduler shutdown");
        for slot in self.slots.iter_mut() {
            slot.task.shutdown();
        }
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn stats(&self, name: &str) -> Option<TaskStats> {
        self.slots.iter().find(|s| s.spec.name == name).map(|s| s.stats)
    }

    /// Task names in execution order.
    pub fn order(&self) -> Vec<&'static str, N> {
        self.slots.iter().map(|s| s.spec.name).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<'a, const N: usize> Default for Scheduler<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}
