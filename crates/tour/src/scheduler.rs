use runtime::timer::Countdown;
use scene::{ExperienceId, NodeId};

use crate::narration::fill_narration;
use crate::plan::{build_auto_plan, ExperienceSource, TourPlan};

/// Paused remainders and resume durations never drop below this, so a
/// pause/resume can't produce an instant (or negative) dwell.
pub const MIN_RESUME_MS: f64 = 500.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TourState {
    Idle,
    Playing,
    Paused,
    Stopped,
    Completed,
}

/// Work the scheduler wants done. Navigation is delegated so the session
/// can switch experiences first when the step crosses a package boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum TourCommand {
    Navigate {
        experience_id: ExperienceId,
        node_id: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TourEvent {
    Started { steps: usize },
    StepChanged { index: usize, narration: Option<String> },
    Paused { remaining_ms: f64 },
    Resumed,
    Stopped,
    Completed,
}

/// Output of a scheduler operation: at most one navigation plus any state
/// events it produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TourOutput {
    pub command: Option<TourCommand>,
    pub events: Vec<TourEvent>,
}

/// Dwell-timed itinerary walker.
///
/// idle -> (planning) -> playing <-> paused -> stopped | completed
///
/// Time is injected; the owner calls `poll` from its frame loop and routes
/// navigation completions back through `on_navigation`.
#[derive(Debug)]
pub struct TourScheduler {
    state: TourState,
    plan: TourPlan,
    index: usize,
    dwell: Countdown,
    remaining_ms: Option<f64>,
    last_applied_node: Option<NodeId>,
    /// The current step's navigation is still in flight; its dwell is armed
    /// only once `on_navigation` reports the landing.
    awaiting_arrival: bool,
}

impl Default for TourScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TourScheduler {
    pub fn new() -> Self {
        Self {
            state: TourState::Idle,
            plan: TourPlan::default(),
            index: 0,
            dwell: Countdown::new(),
            remaining_ms: None,
            last_applied_node: None,
            awaiting_arrival: false,
        }
    }

    pub fn state(&self) -> TourState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TourState::Playing
    }

    pub fn plan(&self) -> &TourPlan {
        &self.plan
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The node the itinerary will visit after the current stop, for aiming
    /// the idle drift.
    pub fn upcoming_node(&self) -> Option<&NodeId> {
        self.plan.step(self.index + 1).map(|s| &s.node_id)
    }

    /// Starts with an authored plan.
    pub fn start(&mut self, now_ms: f64, plan: TourPlan) -> TourOutput {
        if plan.is_empty() {
            self.state = TourState::Stopped;
            return TourOutput {
                command: None,
                events: vec![TourEvent::Stopped],
            };
        }
        self.plan = plan;
        self.state = TourState::Playing;
        self.remaining_ms = None;
        self.last_applied_node = None;

        let mut out = self.go_to_step(now_ms, 0);
        out.events.insert(
            0,
            TourEvent::Started {
                steps: self.plan.len(),
            },
        );
        out
    }

    /// Plans the all-experiences itinerary from `source`, narrates it, and
    /// starts it.
    pub fn start_auto(&mut self, now_ms: f64, source: &mut dyn ExperienceSource) -> TourOutput {
        let mut plan = build_auto_plan(source);
        fill_narration(&mut plan, &source.experiences());
        self.start(now_ms, plan)
    }

    /// Jumps to step `i`. The step's dwell is not armed here; it starts
    /// from the landing echo, so travel and load time never eat into it.
    /// Past the end, the tour completes.
    pub fn go_to_step(&mut self, _now_ms: f64, i: usize) -> TourOutput {
        if self.state != TourState::Playing {
            return TourOutput::default();
        }
        let Some(step) = self.plan.step(i).cloned() else {
            self.dwell.cancel();
            self.state = TourState::Completed;
            return TourOutput {
                command: None,
                events: vec![TourEvent::Completed],
            };
        };

        self.index = i;
        self.last_applied_node = Some(step.node_id.clone());
        self.dwell.cancel();
        self.awaiting_arrival = true;
        TourOutput {
            command: Some(TourCommand::Navigate {
                experience_id: step.experience_id.clone(),
                node_id: step.node_id.clone(),
            }),
            events: vec![TourEvent::StepChanged {
                index: i,
                narration: step.narration.clone(),
            }],
        }
    }

    /// Advances when the current dwell expires.
    pub fn poll(&mut self, now_ms: f64) -> TourOutput {
        if self.state == TourState::Playing && self.dwell.poll(now_ms) {
            return self.go_to_step(now_ms, self.index + 1);
        }
        TourOutput::default()
    }

    /// Cancels the dwell, preserving the time it had left (floored). A pause
    /// while still traveling toward the stop records no remainder; the
    /// arrival banks the step's full dwell instead.
    pub fn pause(&mut self, now_ms: f64) -> TourOutput {
        if self.state != TourState::Playing {
            return TourOutput::default();
        }
        self.remaining_ms = self.dwell.pause(now_ms).map(|r| r.max(MIN_RESUME_MS));
        self.state = TourState::Paused;
        let reported = self
            .remaining_ms
            .or_else(|| self.plan.step(self.index).map(|s| s.dwell_ms()))
            .unwrap_or(MIN_RESUME_MS);
        TourOutput {
            command: None,
            events: vec![TourEvent::Paused {
                remaining_ms: reported,
            }],
        }
    }

    /// Re-arms the dwell for the remainder recorded at pause. With no
    /// remainder the step is still inbound and its landing arms the dwell.
    pub fn resume(&mut self, now_ms: f64) -> TourOutput {
        if self.state != TourState::Paused {
            return TourOutput::default();
        }
        self.state = TourState::Playing;
        if let Some(remaining) = self.remaining_ms.take() {
            self.dwell.arm(now_ms, remaining.max(MIN_RESUME_MS));
        }
        TourOutput {
            command: None,
            events: vec![TourEvent::Resumed],
        }
    }

    pub fn next(&mut self, now_ms: f64) -> TourOutput {
        if self.state != TourState::Playing {
            return TourOutput::default();
        }
        self.dwell.cancel();
        self.go_to_step(now_ms, self.index + 1)
    }

    pub fn prev(&mut self, now_ms: f64) -> TourOutput {
        if self.state != TourState::Playing {
            return TourOutput::default();
        }
        self.dwell.cancel();
        self.go_to_step(now_ms, self.index.saturating_sub(1))
    }

    pub fn stop(&mut self) -> TourOutput {
        if matches!(self.state, TourState::Idle | TourState::Stopped) {
            self.state = TourState::Stopped;
            return TourOutput::default();
        }
        self.dwell.cancel();
        self.remaining_ms = None;
        self.awaiting_arrival = false;
        self.state = TourState::Stopped;
        TourOutput {
            command: None,
            events: vec![TourEvent::Stopped],
        }
    }

    /// Reconciles an externally observed navigation with the itinerary:
    /// the landing the scheduler itself requested starts that step's dwell;
    /// a user-driven move ends autoplay; any other programmatic move that
    /// lands on an upcoming step fast-forwards to it (matching the first
    /// occurrence at or after the current index, so re-visit plans stay
    /// monotonic).
    pub fn on_navigation(&mut self, now_ms: f64, node_id: &str, user_initiated: bool) -> TourOutput {
        if self.state == TourState::Paused
            && !user_initiated
            && self.awaiting_arrival
            && self.last_applied_node.as_deref() == Some(node_id)
        {
            // Landed while paused: bank the full dwell for the resume.
            self.awaiting_arrival = false;
            self.remaining_ms = self.plan.step(self.index).map(|s| s.dwell_ms());
            return TourOutput::default();
        }
        if self.state != TourState::Playing {
            return TourOutput::default();
        }
        if user_initiated {
            return self.stop();
        }
        if self.last_applied_node.as_deref() == Some(node_id) {
            if self.awaiting_arrival {
                self.awaiting_arrival = false;
                if let Some(step) = self.plan.step(self.index) {
                    self.dwell.arm(now_ms, step.dwell_ms());
                }
            }
            return TourOutput::default();
        }
        let matched = (self.index..self.plan.len())
            .find(|&i| self.plan.steps[i].node_id == node_id);
        let Some(i) = matched else {
            return TourOutput::default();
        };

        self.index = i;
        self.last_applied_node = Some(node_id.to_string());
        self.awaiting_arrival = false;
        let step = &self.plan.steps[i];
        self.dwell.arm(now_ms, step.dwell_ms());
        TourOutput {
            command: None,
            events: vec![TourEvent::StepChanged {
                index: i,
                narration: step.narration.clone(),
            }],
        }
    }
}
