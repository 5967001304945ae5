//! Bio-rejection evaluation pass

use anatomy_logic::integrity::IntegrityReport;
use hecs::{Entity, World};

use crate::components::Body;
use crate::events::CostProviders;
use crate::systems::integrity::evaluate_integrity;

/// Consequence policy for a body whose load exceeds its capacity.
/// Called once per rejecting body per evaluation pass.
pub trait RejectionHandler {
    fn on_rejection(&mut self, world: &World, body: Entity, report: &IntegrityReport, now: f64);
}

/// Records every rejection it is told about. Handy for tests and the harness.
#[derive(Debug, Clone, Default)]
pub struct RejectionLog {
    pub records: Vec<(Entity, IntegrityReport, f64)>,
}

impl RejectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_for(&self, body: Entity) -> usize {
        self.records.iter().filter(|(b, _, _)| *b == body).count()
    }
}

impl RejectionHandler for RejectionLog {
    fn on_rejection(&mut self, _world: &World, body: Entity, report: &IntegrityReport, now: f64) {
        self.records.push((body, *report, now));
    }
}

/// Evaluate every body and hand the rejecting ones to each handler.
/// Returns the rejecting bodies with their reports.
pub fn rejection_system(
    world: &World,
    providers: &CostProviders,
    handlers: &mut [Box<dyn RejectionHandler>],
    now: f64,
) -> Vec<(Entity, IntegrityReport)> {
    let bodies: Vec<Entity> = world.query::<&Body>().iter().map(|(e, _)| e).collect();

    let mut rejecting = Vec::new();
    for body in bodies {
        let Some(report) = evaluate_integrity(world, providers, body, now) else {
            continue;
        };
        if !report.is_rejecting() {
            continue;
        }
        log::warn!(
            "body {:?} rejecting: usage {} + penalty {} > capacity {}",
            body,
            report.usage,
            report.penalty,
            report.capacity
        );
        for handler in handlers.iter_mut() {
            handler.on_rejection(world, body, &report, now);
        }
        rejecting.push((body, report));
    }
    rejecting
}
