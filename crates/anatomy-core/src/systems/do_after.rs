//! Timed surgery actions.
//!
//! A started action ends in exactly one of: completion (returned from
//! [`DoAfterQueue::tick`]) or cancellation (explicit, or because its part
//! disappeared). Cancelled actions raise nothing.

use anatomy_logic::layers::StepId;
use anatomy_logic::tools::ToolMethod;
use hecs::{Entity, World};

use crate::components::BodyPart;

pub type ActionId = u64;

/// Everything the step handler needs when the action finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct DoAfterArgs {
    pub user: Entity,
    pub tool: Option<Entity>,
    pub body: Entity,
    pub part: Entity,
    pub step: StepId,
    pub organ: Option<Entity>,
    pub method: ToolMethod,
    /// Seconds until completion.
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub id: ActionId,
    pub args: DoAfterArgs,
    pub started_at: f64,
    pub ends_at: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DoAfterQueue {
    actions: Vec<PendingAction>,
    next_id: ActionId,
}

impl DoAfterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, args: DoAfterArgs, now: f64) -> ActionId {
        self.next_id += 1;
        let id = self.next_id;
        let ends_at = now + args.duration.max(0.0);
        self.actions.push(PendingAction {
            id,
            args,
            started_at: now,
            ends_at,
        });
        id
    }

    /// Returns false if the action already finished or never existed.
    pub fn cancel(&mut self, id: ActionId) -> bool {
        let before = self.actions.len();
        self.actions.retain(|a| a.id != id);
        before != self.actions.len()
    }

    /// Drop every pending action on a part. Returns how many went.
    pub fn cancel_part(&mut self, part: Entity) -> usize {
        let before = self.actions.len();
        self.actions.retain(|a| a.args.part != part);
        before - self.actions.len()
    }

    pub fn is_pending(&self, part: Entity, step: &str) -> bool {
        self.actions
            .iter()
            .any(|a| a.args.part == part && a.args.step == step)
    }

    pub fn get(&self, id: ActionId) -> Option<&PendingAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Finish every action due by `now`, in start order. Actions whose part
    /// no longer exists are cancelled instead.
    pub fn tick(&mut self, world: &World, now: f64) -> Vec<PendingAction> {
        let mut finished = Vec::new();
        let mut remaining = Vec::with_capacity(self.actions.len());

        for action in self.actions.drain(..) {
            if world.get::<&BodyPart>(action.args.part).is_err() {
                log::debug!(
                    "cancelled {} on {:?}: part is gone",
                    action.args.step,
                    action.args.part
                );
                continue;
            }
            if action.ends_at <= now {
                finished.push(action);
            } else {
                remaining.push(action);
            }
        }

        self.actions = remaining;
        finished
    }
}
