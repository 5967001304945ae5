//! In-process message contracts.
//!
//! Collaborators never reach into each other's components directly; they
//! answer request structs (cost requests, validation events) or consume
//! notifications. Each contract is a plain struct plus, where several
//! listeners may answer, a trait the engine keeps a registry of.

use anatomy_logic::catalog::{AnatomyCatalog, SurgeryStep};
use anatomy_logic::layers::{StepId, SurgeryLayer};
use anatomy_logic::tools::ToolMethod;
use hecs::{Entity, World};

use crate::components::IntegrityCost;

/// Structural change in the anatomy graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnatomyNotification {
    PartAttached { body: Entity, part: Entity },
    PartDetached { body: Entity, part: Entity },
    OrganInserted {
        body: Option<Entity>,
        container: Entity,
        organ: Entity,
        category: String,
    },
    OrganRemoved {
        body: Option<Entity>,
        container: Entity,
        organ: Entity,
        category: String,
    },
}

/// Notifications raised since the last drain, in order.
#[derive(Debug, Clone, Default)]
pub struct NotificationQueue {
    pending: Vec<AnatomyNotification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: AnatomyNotification) {
        self.pending.push(notification);
    }

    pub fn drain(&mut self) -> Vec<AnatomyNotification> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[AnatomyNotification] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// "What does this organ cost?" Unanswered requests count as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityCostRequest {
    pub organ: Entity,
    pub cost: Option<i32>,
}

impl IntegrityCostRequest {
    pub fn new(organ: Entity) -> Self {
        Self { organ, cost: None }
    }

    pub fn resolved(&self) -> i32 {
        self.cost.unwrap_or(0)
    }
}

/// Owner logic that knows an organ's intrinsic cost.
pub trait IntegrityCostProvider {
    fn provide(&self, world: &World, request: &mut IntegrityCostRequest);
}

/// Answers from the organ's own `IntegrityCost` component.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentCostProvider;

impl IntegrityCostProvider for ComponentCostProvider {
    fn provide(&self, world: &World, request: &mut IntegrityCostRequest) {
        if request.cost.is_some() {
            return;
        }
        if let Ok(cost) = world.get::<&IntegrityCost>(request.organ) {
            request.cost = Some(cost.0);
        }
    }
}

/// Registered cost providers, asked in registration order.
pub struct CostProviders {
    providers: Vec<Box<dyn IntegrityCostProvider>>,
}

impl CostProviders {
    pub fn empty() -> Self {
        Self { providers: Vec::new() }
    }

    pub fn register(&mut self, provider: Box<dyn IntegrityCostProvider>) {
        self.providers.push(provider);
    }

    pub fn request(&self, world: &World, organ: Entity) -> i32 {
        let mut request = IntegrityCostRequest::new(organ);
        for provider in &self.providers {
            provider.provide(world, &mut request);
        }
        request.resolved()
    }
}

impl Default for CostProviders {
    fn default() -> Self {
        let mut providers = Self::empty();
        providers.register(Box::new(ComponentCostProvider));
        providers
    }
}

/// Raised before a surgery step may start, and again when it completes.
/// Any validator may reject; the first rejection reason is kept.
pub struct SurgeryValidateEvent<'a> {
    pub user: Entity,
    pub tool: Option<Entity>,
    pub body: Entity,
    pub part: Entity,
    pub step: &'a SurgeryStep,
    pub organ: Option<Entity>,
    pub catalog: &'a AnatomyCatalog,
    rejection: Option<String>,
}

impl<'a> SurgeryValidateEvent<'a> {
    pub fn new(
        user: Entity,
        tool: Option<Entity>,
        body: Entity,
        part: Entity,
        step: &'a SurgeryStep,
        organ: Option<Entity>,
        catalog: &'a AnatomyCatalog,
    ) -> Self {
        Self {
            user,
            tool,
            body,
            part,
            step,
            organ,
            catalog,
            rejection: None,
        }
    }

    pub fn reject(&mut self, reason: impl Into<String>) {
        if self.rejection.is_none() {
            self.rejection = Some(reason.into());
        }
    }

    pub fn is_valid(&self) -> bool {
        self.rejection.is_none()
    }

    pub fn rejection(&self) -> Option<&str> {
        self.rejection.as_deref()
    }
}

/// A listener that may veto surgery steps.
pub trait SurgeryValidator {
    fn validate(&self, world: &World, event: &mut SurgeryValidateEvent<'_>);
}

/// Raised on the operated part when a surgery timed action finishes.
/// Exactly one handler applies it; `handled` guards re-application.
#[derive(Debug, Clone, PartialEq)]
pub struct SurgeryStepCompleteEvent {
    pub user: Entity,
    pub tool: Option<Entity>,
    pub body: Entity,
    pub part: Entity,
    pub layer: SurgeryLayer,
    pub step: StepId,
    pub organ: Option<Entity>,
    /// Method chosen when the step was requested.
    pub method: ToolMethod,
    pub handled: bool,
}
