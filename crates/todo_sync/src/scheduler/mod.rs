use crate::model::Task;
use std::time::Duration;
use tokio::time::Instant;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed { deadline: Instant, generation: u64 },
}

/// Owns the single pending countdown tick.
///
/// Arming always cancels the previous tick first, so there is never more
/// than one deadline outstanding.
#[derive(Debug)]
pub struct CountdownScheduler {
    period: Duration,
    state: SchedulerState,
    generation: u64,
}

impl CountdownScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: SchedulerState::Idle,
            generation: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, SchedulerState::Armed { .. })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Armed { deadline, .. } => Some(deadline),
            SchedulerState::Idle => None,
        }
    }

    /// Cancels the pending tick, if any, and schedules a new one a full
    /// period from now. Returns the generation of the new tick.
    pub fn arm(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;
        self.state = SchedulerState::Armed {
            deadline: Instant::now() + self.period,
            generation: self.generation,
        };
        tracing::trace!(generation = self.generation, "countdown armed");
        self.generation
    }

    /// Returns whether a tick was pending.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.is_armed();
        self.state = SchedulerState::Idle;
        was_armed
    }

    /// Resolves once the pending tick is due and returns its generation.
    /// Never resolves while idle. Dropping the future leaves the tick armed.
    pub async fn fired(&mut self) -> u64 {
        match self.state {
            SchedulerState::Idle => std::future::pending().await,
            SchedulerState::Armed {
                deadline,
                generation,
            } => {
                tokio::time::sleep_until(deadline).await;
                self.state = SchedulerState::Idle;
                generation
            }
        }
    }
}

impl Default for CountdownScheduler {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

/// One countdown step over the whole collection.
pub fn decrement_all(tasks: &[Task]) -> Vec<Task> {
    tasks
        .iter()
        .map(|task| {
            debug_assert!(task.is_consistent(), "done task {} has time left", task.id);
            if task.time > 0 {
                task.decremented()
            } else {
                task.clone()
            }
        })
        .collect()
}
