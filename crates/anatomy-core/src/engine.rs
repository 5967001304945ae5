//! Anatomy engine - main entry point for running the simulation

use anatomy_logic::catalog::AnatomyCatalog;
use anatomy_logic::integrity::{IntegrityReport, PenaltyBreakdown};
use anatomy_logic::layers::StepId;
use hecs::{Entity, World};

use crate::components::*;
use crate::error::{AnatomyError, SurgeryError};
use crate::events::{AnatomyNotification, CostProviders, IntegrityCostProvider, NotificationQueue, SurgeryValidator};
use crate::generation::{spawn_body, spawn_organ, spawn_tool};
use crate::systems::*;

/// Seconds between lazy sweeps of expired boosts.
const BOOST_PRUNE_INTERVAL: f64 = 10.0;
/// Seconds between rejection evaluation passes.
const REJECTION_INTERVAL: f64 = 1.0;

/// Main simulation engine
pub struct AnatomyEngine {
    /// ECS world containing all entities
    pub world: World,
    /// Static content and tuning
    pub catalog: AnatomyCatalog,
    /// Simulation time in seconds since start
    pub sim_time: f64,

    notifications: NotificationQueue,
    last_notifications: Vec<AnatomyNotification>,
    do_after: DoAfterQueue,
    validators: SurgeryValidators,
    cost_providers: CostProviders,
    rejection_handlers: Vec<Box<dyn RejectionHandler>>,
    rejecting: Vec<(Entity, IntegrityReport)>,

    // Update timing
    last_prune: f64,
    last_rejection_check: f64,

    time_scale: f32,
}

impl AnatomyEngine {
    /// Create an empty simulation over `catalog`
    pub fn new(catalog: AnatomyCatalog) -> Self {
        Self {
            world: World::new(),
            catalog,
            sim_time: 0.0,
            notifications: NotificationQueue::new(),
            last_notifications: Vec::new(),
            do_after: DoAfterQueue::new(),
            validators: SurgeryValidators::default(),
            cost_providers: CostProviders::default(),
            rejection_handlers: Vec::new(),
            rejecting: Vec::new(),
            last_prune: 0.0,
            last_rejection_check: 0.0,
            time_scale: 1.0,
        }
    }

    pub fn register_validator(&mut self, validator: Box<dyn SurgeryValidator>) {
        self.validators.register(validator);
    }

    pub fn register_cost_provider(&mut self, provider: Box<dyn IntegrityCostProvider>) {
        self.cost_providers.register(provider);
    }

    pub fn register_rejection_handler(&mut self, handler: Box<dyn RejectionHandler>) {
        self.rejection_handlers.push(handler);
    }

    /// Spawn a complete body of a catalog species
    pub fn spawn_body(&mut self, species: &str) -> Result<Entity, AnatomyError> {
        spawn_body(&mut self.world, &mut self.notifications, &self.catalog, species)
    }

    /// Spawn a loose organ, e.g. an implant waiting to be inserted
    pub fn spawn_organ(&mut self, prototype: &str) -> Result<Entity, AnatomyError> {
        spawn_organ(&mut self.world, &mut self.notifications, &self.catalog, prototype)
    }

    pub fn spawn_tool<I, S>(&mut self, qualities: I, sterile: bool) -> Entity
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        spawn_tool(&mut self.world, qualities, sterile)
    }

    pub fn attach_part(&mut self, body: Entity, part: Entity) -> Result<(), AnatomyError> {
        attach_part(&mut self.world, &mut self.notifications, body, part)
    }

    pub fn detach_part(&mut self, body: Entity, part: Entity) -> Result<(), AnatomyError> {
        detach_part(&mut self.world, &mut self.notifications, body, part)
    }

    pub fn transfer_part(&mut self, part: Entity, to: Entity) -> Result<(), AnatomyError> {
        transfer_part(&mut self.world, &mut self.notifications, part, to)
    }

    pub fn insert_organ(&mut self, part: Entity, organ: Entity) -> Result<(), AnatomyError> {
        insert_organ(&mut self.world, &mut self.notifications, part, organ)
    }

    pub fn remove_organ(&mut self, part: Entity, organ: Entity) -> Result<(), AnatomyError> {
        remove_organ(&mut self.world, &mut self.notifications, part, organ)
    }

    /// Despawn a body with everything in it; its pending actions go too.
    pub fn despawn_body(&mut self, body: Entity) -> Result<usize, AnatomyError> {
        let parts = self
            .world
            .get::<&Body>(body)
            .map(|b| b.parts.clone())
            .unwrap_or_default();
        for part in parts {
            self.do_after.cancel_part(part);
        }
        despawn_body(&mut self.world, body)
    }

    /// Ask to perform a surgery step; it completes during a later update.
    pub fn request_step(
        &mut self,
        user: Entity,
        tool: Option<Entity>,
        part: Entity,
        step: &str,
        organ: Option<Entity>,
    ) -> Result<ActionId, SurgeryError> {
        let request = SurgeryRequest {
            user,
            tool,
            part,
            step: step.to_string(),
            organ,
        };
        request_step(
            &self.world,
            &self.catalog,
            &self.validators,
            &mut self.do_after,
            request,
            self.sim_time,
        )
    }

    /// Cancel a running step. Nothing it would have done happens.
    pub fn cancel(&mut self, action: ActionId) -> bool {
        self.do_after.cancel(action)
    }

    pub fn pending_action(&self, action: ActionId) -> Option<&PendingAction> {
        self.do_after.get(action)
    }

    pub fn apply_reagent_boost(
        &mut self,
        organ: Entity,
        reagent: &str,
        amount: i32,
        duration: f64,
    ) -> Result<(), AnatomyError> {
        apply_reagent_boost(&mut self.world, organ, reagent, amount, duration, self.sim_time)
    }

    /// End a reagent's boost early.
    pub fn remove_boost(&mut self, organ: Entity, reagent: &str) -> bool {
        remove_boost(&mut self.world, organ, reagent)
    }

    /// Update the simulation by delta_seconds
    pub fn update(&mut self, delta_seconds: f32) {
        let scaled_delta = delta_seconds * self.time_scale;
        self.sim_time += scaled_delta as f64;
        let now = self.sim_time;

        // Finished surgery actions
        for action in self.do_after.tick(&self.world, now) {
            let Some(mut event) = completion_event(&self.catalog, &action) else {
                log::debug!("dropping completion of unconfigured step {}", action.args.step);
                continue;
            };
            handle_step_completed(
                &mut self.world,
                &mut self.notifications,
                &self.catalog,
                &self.validators,
                &mut event,
            );
        }

        // Structural notifications feed the regeneration scheduler
        let drained = self.notifications.drain();
        observe_removals(&mut self.world, &self.catalog, &drained, now);
        self.last_notifications = drained;

        regeneration_system(&mut self.world, &mut self.notifications, &self.catalog, now);

        if now - self.last_prune >= BOOST_PRUNE_INTERVAL {
            prune_expired_boosts(&mut self.world, now);
            self.last_prune = now;
        }

        if now - self.last_rejection_check >= REJECTION_INTERVAL {
            self.rejecting = rejection_system(
                &self.world,
                &self.cost_providers,
                &mut self.rejection_handlers,
                now,
            );
            self.last_rejection_check = now;
        }

        #[cfg(debug_assertions)]
        self.check_containment();
    }

    /// Panics on a containment inconsistency; these are programming faults.
    #[cfg(debug_assertions)]
    fn check_containment(&self) {
        for (body, _) in self.world.query::<&Body>().iter() {
            if let Err(violation) = verify_containment(&self.world, body) {
                panic!("{violation}");
            }
        }
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn body_count(&self) -> usize {
        self.world.query::<&Body>().iter().count()
    }

    pub fn parts(&self, body: Entity) -> Vec<Entity> {
        self.world
            .get::<&Body>(body)
            .map(|b| b.parts.clone())
            .unwrap_or_default()
    }

    /// First attached part of a category.
    pub fn part(&self, body: Entity, category: &str) -> Option<Entity> {
        self.parts(body).into_iter().find(|p| {
            self.world
                .get::<&BodyPart>(*p)
                .map(|p| p.category == category)
                .unwrap_or(false)
        })
    }

    /// Installed organ of a category, nested organs included.
    pub fn organ(&self, body: Entity, category: &str) -> Option<Entity> {
        all_organs(&self.world, body).find(|o| {
            self.world
                .get::<&Organ>(*o)
                .map(|o| o.category == category)
                .unwrap_or(false)
        })
    }

    pub fn usage(&self, body: Entity) -> i32 {
        compute_usage(&self.world, &self.cost_providers, body)
    }

    pub fn penalty(&self, body: Entity) -> PenaltyBreakdown {
        compute_total_penalty(&self.world, body)
    }

    pub fn capacity(&self, body: Entity) -> i32 {
        effective_capacity(&self.world, body, self.sim_time)
    }

    pub fn integrity(&self, body: Entity) -> Option<IntegrityReport> {
        evaluate_integrity(&self.world, &self.cost_providers, body, self.sim_time)
    }

    pub fn available_steps(&self, body: Entity, part: Entity) -> Vec<StepId> {
        available_steps(&self.world, &self.catalog, body, part)
    }

    pub fn snapshot(&self, body: Entity, selected: Option<Entity>) -> Option<SurgerySnapshot> {
        let mut snapshot = surgery_snapshot(&self.world, &self.catalog, body, selected)?;
        snapshot.integrity = self.integrity(body);
        Some(snapshot)
    }

    /// Notifications processed by the most recent update.
    pub fn last_notifications(&self) -> &[AnatomyNotification] {
        &self.last_notifications
    }

    /// Bodies found rejecting by the most recent evaluation pass.
    pub fn rejecting(&self) -> &[(Entity, IntegrityReport)] {
        &self.rejecting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anatomy_logic::constants::{organ_categories, part_categories, qualities, species, steps};
    use anatomy_logic::layers::SurgeryLayer;

    fn engine() -> AnatomyEngine {
        AnatomyEngine::new(AnatomyCatalog::builtin().unwrap())
    }

    fn kit(engine: &mut AnatomyEngine) -> Entity {
        engine.spawn_tool(
            [
                qualities::SLICING,
                qualities::RETRACTING,
                qualities::CLAMPING,
                qualities::EXTRACTING,
                qualities::IMPLANTING,
                qualities::SUTURING,
            ],
            true,
        )
    }

    /// Request a step and tick until it is done.
    fn operate(engine: &mut AnatomyEngine, tool: Entity, part: Entity, step: &str, organ: Option<Entity>) {
        let surgeon = engine.world.spawn(());
        engine.request_step(surgeon, Some(tool), part, step, organ).unwrap();
        for _ in 0..10 {
            engine.update(1.0);
        }
    }

    #[test]
    fn test_new_engine() {
        let engine = engine();
        assert_eq!(engine.body_count(), 0);
        assert_eq!(engine.sim_time(), 0.0);
    }

    #[test]
    fn test_human_idles_at_zero() {
        let mut engine = engine();
        let body = engine.spawn_body(species::HUMAN).unwrap();
        assert!(engine.organ(body, organ_categories::HAND_LEFT).is_some());
        assert!(engine.organ(body, organ_categories::HAND_RIGHT).is_some());

        for _ in 0..5 {
            engine.update(1.0);
        }
        assert_eq!(engine.usage(body), 0);
        assert_eq!(engine.penalty(body).total, 0);
        assert_eq!(engine.capacity(body), 10);
        assert!(engine.rejecting().is_empty());
    }

    #[test]
    fn test_time_scale() {
        let mut engine = engine();
        engine.set_time_scale(2.0);
        engine.update(1.5);
        assert_eq!(engine.sim_time(), 3.0);
        engine.set_time_scale(-1.0);
        assert_eq!(engine.time_scale(), 0.0);
    }

    #[test]
    fn test_surgery_through_engine() {
        let mut engine = engine();
        let body = engine.spawn_body(species::HUMAN).unwrap();
        let torso = engine.part(body, part_categories::TORSO).unwrap();
        let tool = kit(&mut engine);

        operate(&mut engine, tool, torso, steps::INCISION, None);
        operate(&mut engine, tool, torso, steps::RETRACT_SKIN, None);
        operate(&mut engine, tool, torso, steps::CLAMP_VESSELS, None);
        operate(&mut engine, tool, torso, steps::RETRACT_TISSUE, None);
        assert_eq!(engine.penalty(body).total, 2);

        let heart = engine.organ(body, organ_categories::HEART).unwrap();
        operate(&mut engine, tool, torso, steps::REMOVE_ORGAN, Some(heart));
        assert!(engine.organ(body, organ_categories::HEART).is_none());

        let cyber = engine.spawn_organ("cyber-heart").unwrap();
        operate(&mut engine, tool, torso, steps::INSERT_ORGAN, Some(cyber));
        assert_eq!(engine.organ(body, organ_categories::HEART), Some(cyber));
        assert_eq!(engine.usage(body), 4);

        let snapshot = engine.snapshot(body, Some(torso)).unwrap();
        let torso_view = snapshot.part(torso).unwrap();
        assert!(torso_view.layers.iter().any(|l| l.layer == SurgeryLayer::Organ && l.open));
        assert_eq!(snapshot.integrity.unwrap().usage, 4);
    }

    #[test]
    fn test_cancel_through_engine() {
        let mut engine = engine();
        let body = engine.spawn_body(species::HUMAN).unwrap();
        let torso = engine.part(body, part_categories::TORSO).unwrap();
        let tool = kit(&mut engine);
        let surgeon = engine.world.spawn(());

        let id = engine.request_step(surgeon, Some(tool), torso, steps::INCISION, None).unwrap();
        engine.update(1.0);
        assert!(engine.cancel(id));
        for _ in 0..5 {
            engine.update(1.0);
        }
        let snapshot = engine.snapshot(body, None).unwrap();
        assert!(snapshot.part(torso).unwrap().layers.iter().all(|l| l.performed.is_empty()));
    }

    #[test]
    fn test_rejection_pass() {
        let mut engine = engine();
        let body = engine.spawn_body(species::HUMAN).unwrap();
        let torso = engine.part(body, part_categories::TORSO).unwrap();
        engine.register_rejection_handler(Box::new(RejectionLog::new()));

        let liver = engine.organ(body, organ_categories::LIVER).unwrap();
        engine.remove_organ(torso, liver).unwrap();
        let pump = engine.spawn_organ("crude-liver-pump").unwrap();
        engine.insert_organ(torso, pump).unwrap();
        let heart = engine.organ(body, organ_categories::HEART).unwrap();
        engine.remove_organ(torso, heart).unwrap();
        let cyber = engine.spawn_organ("cyber-heart").unwrap();
        engine.insert_organ(torso, cyber).unwrap();

        // 2 + 4 usage, 2 penalty: fits in 10.
        engine.update(1.0);
        assert!(engine.rejecting().is_empty());

        let head = engine.part(body, part_categories::HEAD).unwrap();
        let eyes = engine.organ(body, organ_categories::EYES).unwrap();
        engine.remove_organ(head, eyes).unwrap();
        let cyber_eyes = engine.spawn_organ("cyber-eyes").unwrap();
        engine.insert_organ(head, cyber_eyes).unwrap();
        let arm = engine.part(body, part_categories::ARM_LEFT).unwrap();
        let hand = engine.organ(body, organ_categories::HAND_LEFT).unwrap();
        engine.remove_organ(arm, hand).unwrap();
        let cyber_hand = engine.spawn_organ("cyber-hand-left").unwrap();
        engine.insert_organ(arm, cyber_hand).unwrap();

        // 11 usage + 3 penalty > 10
        engine.update(1.0);
        assert_eq!(engine.rejecting().len(), 1);
        assert_eq!(engine.rejecting()[0].1.excess(), 4);

        engine.apply_reagent_boost(cyber, "immunosuppressant", 5, 30.0).unwrap();
        engine.update(1.0);
        assert!(engine.rejecting().is_empty());
    }

    #[test]
    fn test_notifications_reach_scheduler() {
        let mut engine = engine();
        let body = engine.spawn_body(species::SALAMANDER).unwrap();
        let arm = engine.part(body, part_categories::ARM_RIGHT).unwrap();
        let limb = engine.organ(body, organ_categories::ARM_RIGHT).unwrap();
        engine.remove_organ(arm, limb).unwrap();

        engine.update(1.0);
        assert!(engine
            .last_notifications()
            .iter()
            .any(|n| matches!(n, AnatomyNotification::OrganRemoved { organ, .. } if *organ == limb)));
        assert!(engine.world.get::<&RegenerationTracker>(body).is_ok());
    }
}
