//! Surgery step state machine.
//!
//! A step is requested, validated by every registered validator, then runs
//! as a timed action. When the action finishes the step handler validates
//! again (the world may have moved on while the surgeon worked) and only
//! then applies the step's effects: progress, organ moves and penalties.

use anatomy_logic::catalog::{AnatomyCatalog, StepKind, SurgeryStep};
use anatomy_logic::integrity::{PenaltyCategory, PenaltyEntry};
use anatomy_logic::layers::{PartProgress, StepId};
use anatomy_logic::tools::ToolMethod;
use hecs::{Entity, World};

use crate::components::{Body, BodyPart, IntegritySurgeryContext, Organ, SurgeryProgress, Tool};
use crate::error::{AnatomyError, SurgeryError};
use crate::events::{
    NotificationQueue, SurgeryStepCompleteEvent, SurgeryValidateEvent, SurgeryValidator,
};
use crate::systems::do_after::{ActionId, DoAfterArgs, DoAfterQueue, PendingAction};
use crate::systems::graph::{body_of, insert_organ, remove_organ};
use crate::systems::integrity::{
    apply_contextual_penalty, clear_contextual_penalties, clear_repairable_penalties,
};

/// Part must be attached to a live body, and to the body the event names.
pub struct PartAttachedValidator;

impl SurgeryValidator for PartAttachedValidator {
    fn validate(&self, world: &World, event: &mut SurgeryValidateEvent<'_>) {
        if world.get::<&Body>(event.body).is_err() {
            event.reject("there is no body to operate on");
            return;
        }
        match world.get::<&BodyPart>(event.part) {
            Ok(part) if part.body == Some(event.body) => {}
            _ => event.reject("that part is not attached to the patient"),
        }
    }
}

/// The tool must qualify for the step's operation, properly or improvised.
pub struct ToolValidator;

impl SurgeryValidator for ToolValidator {
    fn validate(&self, world: &World, event: &mut SurgeryValidateEvent<'_>) {
        if select_method(world, event.catalog, event.step, event.tool).is_none() {
            event.reject(format!("no suitable tool to {}", event.step.name));
        }
    }
}

/// Steps happen in layer order on each part.
pub struct LayerOrderValidator;

impl SurgeryValidator for LayerOrderValidator {
    fn validate(&self, world: &World, event: &mut SurgeryValidateEvent<'_>) {
        let progress = part_progress(world, event.body, event.part);
        if let Err(reason) = event.catalog.requirements().check_step(&progress, event.step) {
            event.reject(reason);
        }
    }
}

/// Organ steps need a suitable organ: a direct child of the part to remove,
/// or a loose organ the part has a free slot for to insert.
pub struct OrganTargetValidator;

impl SurgeryValidator for OrganTargetValidator {
    fn validate(&self, world: &World, event: &mut SurgeryValidateEvent<'_>) {
        match event.step.kind {
            StepKind::RemoveOrgan => {
                let Some(organ) = event.organ else {
                    event.reject("choose an organ to remove");
                    return;
                };
                let parent = world.get::<&Organ>(organ).ok().and_then(|o| o.parent);
                if parent != Some(event.part) {
                    event.reject("that organ is not in this part");
                }
            }
            StepKind::InsertOrgan => {
                let Some(organ) = event.organ else {
                    event.reject("choose an organ to insert");
                    return;
                };
                let Ok(o) = world.get::<&Organ>(organ) else {
                    event.reject("that is not an organ");
                    return;
                };
                if o.parent.is_some() {
                    event.reject("that organ is still inside something");
                    return;
                }
                let Ok(part) = world.get::<&BodyPart>(event.part) else {
                    return;
                };
                if !part.has_slot(&o.category) {
                    event.reject(format!("there is no place for a {} here", o.category));
                } else if part.is_full() || (!o.allow_duplicates && slot_taken(world, &part, &o.category)) {
                    event.reject(format!("there is already a {} here", o.category));
                }
            }
            StepKind::Open | StepKind::Close | StepKind::Repair => {}
        }
    }
}

fn slot_taken(world: &World, part: &BodyPart, category: &str) -> bool {
    part.organs.iter().any(|o| {
        world
            .get::<&Organ>(*o)
            .map(|o| o.category == category)
            .unwrap_or(false)
    })
}

/// Registered validators, asked in registration order.
pub struct SurgeryValidators {
    validators: Vec<Box<dyn SurgeryValidator>>,
}

impl SurgeryValidators {
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    pub fn register(&mut self, validator: Box<dyn SurgeryValidator>) {
        self.validators.push(validator);
    }

    pub fn run(&self, world: &World, event: &mut SurgeryValidateEvent<'_>) {
        for validator in &self.validators {
            validator.validate(world, event);
        }
    }
}

impl Default for SurgeryValidators {
    fn default() -> Self {
        let mut validators = Self::empty();
        validators.register(Box::new(PartAttachedValidator));
        validators.register(Box::new(LayerOrderValidator));
        validators.register(Box::new(ToolValidator));
        validators.register(Box::new(OrganTargetValidator));
        validators
    }
}

/// Who wants to do what, where.
#[derive(Debug, Clone, PartialEq)]
pub struct SurgeryRequest {
    pub user: Entity,
    pub tool: Option<Entity>,
    pub part: Entity,
    pub step: StepId,
    pub organ: Option<Entity>,
}

/// Recorded progress of one part, empty when nothing was done yet.
pub fn part_progress(world: &World, body: Entity, part: Entity) -> PartProgress {
    world
        .get::<&SurgeryProgress>(body)
        .map(|p| p.part(part))
        .unwrap_or_default()
}

/// How `tool` would perform the step's operation. `None` when the
/// operation is not configured or the tool does not qualify.
pub fn select_method(
    world: &World,
    catalog: &AnatomyCatalog,
    step: &SurgeryStep,
    tool: Option<Entity>,
) -> Option<ToolMethod> {
    let operation = catalog.operation(&step.operation)?;
    if !operation.needs_tool() {
        return Some(ToolMethod::Primary);
    }
    let tool = world.get::<&Tool>(tool?).ok()?;
    operation.select_method(&tool.qualities)
}

/// Validate a step and start its timed action.
pub fn request_step(
    world: &World,
    catalog: &AnatomyCatalog,
    validators: &SurgeryValidators,
    queue: &mut DoAfterQueue,
    request: SurgeryRequest,
    now: f64,
) -> Result<ActionId, SurgeryError> {
    let step = catalog.step(&request.step).ok_or_else(|| {
        SurgeryError::ValidationRejected(format!("unknown surgery step `{}`", request.step))
    })?;
    let body = body_of(world, request.part).ok_or_else(|| {
        SurgeryError::ValidationRejected("that part is not attached to the patient".to_string())
    })?;
    if queue.is_pending(request.part, &step.id) {
        return Err(SurgeryError::ValidationRejected(format!(
            "already working to {}",
            step.name
        )));
    }

    let mut event = SurgeryValidateEvent::new(
        request.user,
        request.tool,
        body,
        request.part,
        step,
        request.organ,
        catalog,
    );
    validators.run(world, &mut event);
    if let Some(reason) = event.rejection() {
        return Err(SurgeryError::ValidationRejected(reason.to_string()));
    }

    let method = select_method(world, catalog, step, request.tool).ok_or_else(|| {
        SurgeryError::ValidationRejected(format!("no suitable tool to {}", step.name))
    })?;
    let duration = step.duration as f64 * method.speed_modifier() as f64;

    let id = queue.start(
        DoAfterArgs {
            user: request.user,
            tool: request.tool,
            body,
            part: request.part,
            step: step.id.clone(),
            organ: request.organ,
            method,
            duration,
        },
        now,
    );
    log::debug!("started {} on {:?} ({:.1}s)", step.id, request.part, duration);
    Ok(id)
}

/// Completion event for a finished action. `None` if the step left the
/// catalog while the action ran.
pub fn completion_event(catalog: &AnatomyCatalog, action: &PendingAction) -> Option<SurgeryStepCompleteEvent> {
    let step = catalog.step(&action.args.step)?;
    Some(SurgeryStepCompleteEvent {
        user: action.args.user,
        tool: action.args.tool,
        body: action.args.body,
        part: action.args.part,
        layer: step.layer,
        step: step.id.clone(),
        organ: action.args.organ,
        method: action.args.method.clone(),
        handled: false,
    })
}

/// Apply a finished step. Returns whether it was applied; stale or
/// already-handled completions are dropped without changing anything.
pub fn handle_step_completed(
    world: &mut World,
    notes: &mut NotificationQueue,
    catalog: &AnatomyCatalog,
    validators: &SurgeryValidators,
    event: &mut SurgeryStepCompleteEvent,
) -> bool {
    if event.handled {
        return false;
    }
    let Some(step) = catalog.step(&event.step) else {
        log::debug!("dropping completion of unknown step {}", event.step);
        return false;
    };

    if body_of(world, event.part) != Some(event.body) {
        log::debug!("dropping stale {}: part left the body", step.id);
        return false;
    }
    let mut check = SurgeryValidateEvent::new(
        event.user,
        event.tool,
        event.body,
        event.part,
        step,
        event.organ,
        catalog,
    );
    validators.run(world, &mut check);
    if let Some(reason) = check.rejection() {
        log::debug!("dropping stale {}: {}", step.id, reason);
        return false;
    }

    match apply_step(world, notes, catalog, step, event) {
        Ok(()) => {
            event.handled = true;
            log::info!("{:?}: completed {} on {:?}", event.body, step.id, event.part);
            true
        }
        Err(err) => {
            log::debug!("dropping stale {}: {}", step.id, err);
            false
        }
    }
}

fn apply_step(
    world: &mut World,
    notes: &mut NotificationQueue,
    catalog: &AnatomyCatalog,
    step: &SurgeryStep,
    event: &SurgeryStepCompleteEvent,
) -> Result<(), AnatomyError> {
    let body = event.body;
    let part = event.part;

    // Graph changes first: they are the only part that can still fail.
    match step.kind {
        StepKind::RemoveOrgan => {
            let organ = event.organ.ok_or(AnatomyError::MissingEntity(part))?;
            remove_organ(world, notes, part, organ)?;
        }
        StepKind::InsertOrgan => {
            let organ = event.organ.ok_or(AnatomyError::MissingEntity(part))?;
            insert_organ(world, notes, part, organ)?;
        }
        StepKind::Open | StepKind::Close | StepKind::Repair => {}
    }

    if world.get::<&SurgeryProgress>(body).is_err() {
        world
            .insert_one(body, SurgeryProgress::default())
            .map_err(|_| AnatomyError::MissingEntity(body))?;
    }
    {
        let mut progress = world
            .get::<&mut SurgeryProgress>(body)
            .map_err(|_| AnatomyError::MissingEntity(body))?;
        let entry = progress.parts.entry(part).or_default();
        if step.kind == StepKind::Close {
            entry.close(step.layer);
        } else {
            entry.record(step.layer, step.id.clone());
        }
        if entry.is_empty() {
            progress.parts.remove(&part);
        }
    }

    refresh_open_layers(world, catalog, body, part)?;

    if let Some(tool) = event.tool {
        let sterile = world.get::<&Tool>(tool).map(|t| t.sterile).unwrap_or(true);
        if sterile {
            clear_contextual_penalties(world, body, &PenaltyCategory::Unsanitary)?;
        } else if !has_context(world, body, &PenaltyCategory::Unsanitary) {
            apply_contextual_penalty(
                world,
                body,
                PenaltyEntry::new(
                    "unsanitary instruments",
                    PenaltyCategory::Unsanitary,
                    catalog.tuning.unsanitary_penalty,
                ),
            )?;
        }
    }

    if let ToolMethod::Improvised {
        penalty,
        repair_operation,
        ..
    } = &event.method
    {
        if *penalty != 0 {
            let mut entry = PenaltyEntry::new(
                format!("{} with an improvised tool", step.name),
                PenaltyCategory::ImprovisedTool,
                *penalty,
            );
            if let Some(op) = repair_operation {
                entry = entry.with_repair(op.clone());
            }
            apply_contextual_penalty(world, body, entry)?;
        }
    }

    if step.kind == StepKind::Repair {
        let cleared = clear_repairable_penalties(world, body, &step.operation)?;
        log::debug!("{} cleared {} penalties", step.id, cleared);
    }

    Ok(())
}

fn has_context(world: &World, body: Entity, category: &PenaltyCategory) -> bool {
    world
        .get::<&IntegritySurgeryContext>(body)
        .map(|c| c.has_category(category))
        .unwrap_or(false)
}

/// Replace the part's open-wound entry with one reflecting its current
/// layers: a group named after the part with one child per open layer.
fn refresh_open_layers(
    world: &mut World,
    catalog: &AnatomyCatalog,
    body: Entity,
    part: Entity,
) -> Result<(), AnatomyError> {
    let category = PenaltyCategory::OpenLayers {
        part: part.to_bits().get(),
    };
    clear_contextual_penalties(world, body, &category)?;

    let progress = part_progress(world, body, part);
    let wounds = catalog.requirements().open_wounds(&progress);
    if wounds.is_empty() {
        return Ok(());
    }

    let name = world
        .get::<&BodyPart>(part)
        .map(|p| p.category.clone())
        .unwrap_or_default();
    let children = wounds
        .into_iter()
        .map(|layer| {
            PenaltyEntry::new(
                format!("{}: {} retracted", name, layer.label()),
                category.clone(),
                catalog.tuning.open_layer_penalty,
            )
        })
        .collect();
    apply_contextual_penalty(world, body, PenaltyEntry::group(name, category, children))
}

/// Steps that could be requested on `part` right now, ignoring tools.
pub fn available_steps(world: &World, catalog: &AnatomyCatalog, body: Entity, part: Entity) -> Vec<StepId> {
    let Ok(p) = world.get::<&BodyPart>(part) else {
        return Vec::new();
    };
    if p.body != Some(body) {
        return Vec::new();
    }
    let progress = part_progress(world, body, part);

    catalog
        .steps()
        .filter(|step| catalog.requirements().check_step(&progress, step).is_ok())
        .filter(|step| match step.kind {
            StepKind::RemoveOrgan => !p.organs.is_empty(),
            StepKind::InsertOrgan => {
                !p.is_full() && p.slots.iter().any(|slot| !slot_taken(world, &p, slot))
            }
            StepKind::Open | StepKind::Close | StepKind::Repair => true,
        })
        .map(|step| step.id.clone())
        .collect()
}
