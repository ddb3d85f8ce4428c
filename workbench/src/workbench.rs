use std::collections::{HashMap, HashSet};
use std::mem;
use std::time::Duration;

use alchemist_engine::{CombinationResult, Oracle, Orchestrator, SessionContext};
use alchemist_types::{Bounds, Element, ElementId, InstanceId, Offset, PairId, Position, Size};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::WorkbenchError;
use crate::command::{SurfaceCommand, SurfaceHandle};
use crate::instance::{Instance, Resolution};
use crate::notice::WorkbenchNotice;
use crate::spatial::SpatialIndex;

const COMPLETION_CHANNEL_CAPACITY: usize = 64;
const FETCH_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkbenchSettings {
    pub bounds: Bounds,
    pub element_size: Size,
    /// How long a combination result is shown before it becomes an instance.
    pub display_interval: Duration,
    pub duplicate_offset: Offset,
    /// Capacity of the `SurfaceCommand` queue.
    pub command_capacity: usize,
}

impl Default for WorkbenchSettings {
    fn default() -> Self {
        Self {
            bounds: Bounds::new(1200.0, 800.0),
            element_size: Size::square(64.0),
            display_interval: Duration::from_millis(3000),
            duplicate_offset: Offset::new(24.0, 24.0),
            command_capacity: 64,
        }
    }
}

/// Result of dropping an element onto the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropOutcome {
    pub instance: InstanceId,
    /// Set when the drop landed on a `Placed` instance and started a pair.
    pub pair: Option<PairId>,
}

#[derive(Debug)]
struct PendingPair {
    first: InstanceId,
    second: InstanceId,
    /// Drop position of `second` when the pair started.
    anchor: Position,
}

#[derive(Debug)]
struct PendingDisplay {
    pair: PairId,
    element: Element,
    position: Position,
    due: Instant,
}

#[derive(Debug)]
struct Completion {
    pair: PairId,
    result: CombinationResult,
}

#[derive(Debug)]
struct Fetched {
    requested: ElementId,
    element: Option<Element>,
}

/// Positioned element instances on one interactive surface.
///
/// All mutation happens on the owner's thread. Oracle calls run as spawned
/// tasks whose completions are applied by [`Workbench::tick`]; nothing here
/// blocks.
pub struct Workbench<O> {
    orchestrator: Orchestrator<O>,
    session: SessionContext,
    settings: WorkbenchSettings,
    spatial: SpatialIndex,
    /// Creation order; later entries draw on top.
    instances: Vec<Instance>,
    next_instance: u64,
    next_pair: u64,
    pairs: HashMap<PairId, PendingPair>,
    displays: Vec<PendingDisplay>,
    combines_in_flight: usize,
    awaiting_fetch: HashSet<ElementId>,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    fetch_tx: mpsc::Sender<Fetched>,
    fetch_rx: mpsc::Receiver<Fetched>,
    command_tx: mpsc::Sender<SurfaceCommand>,
    command_rx: mpsc::Receiver<SurfaceCommand>,
}

impl<O: Oracle> Workbench<O> {
    #[must_use]
    pub fn new(
        orchestrator: Orchestrator<O>,
        session: SessionContext,
        settings: WorkbenchSettings,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_CHANNEL_CAPACITY);
        let (fetch_tx, fetch_rx) = mpsc::channel(FETCH_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(settings.command_capacity.max(1));
        Self {
            orchestrator,
            session,
            spatial: SpatialIndex::new(settings.bounds, settings.element_size),
            settings,
            instances: Vec::new(),
            next_instance: 1,
            next_pair: 1,
            pairs: HashMap::new(),
            displays: Vec::new(),
            combines_in_flight: 0,
            awaiting_fetch: HashSet::new(),
            completion_tx,
            completion_rx,
            fetch_tx,
            fetch_rx,
            command_tx,
            command_rx,
        }
    }

    /// A handle other surfaces use to queue commands for this workbench.
    #[must_use]
    pub fn handle(&self) -> SurfaceHandle {
        SurfaceHandle::new(self.command_tx.clone())
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    #[must_use]
    pub fn settings(&self) -> &WorkbenchSettings {
        &self.settings
    }

    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.iter().find(|i| i.id() == id)
    }

    fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.iter_mut().find(|i| i.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// No combination, fetch or pending display outstanding.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.combines_in_flight == 0 && self.awaiting_fetch.is_empty() && self.displays.is_empty()
    }

    fn next_instance_id(&mut self) -> InstanceId {
        let id = InstanceId::new(self.next_instance);
        self.next_instance += 1;
        id
    }

    /// Place an element. Unknown ids get a placeholder snapshot and a
    /// targeted fetch; this never fails.
    pub fn place(&mut self, element_id: ElementId, position: Position) -> InstanceId {
        let position = self.spatial.clamp(position);
        let id = self.next_instance_id();
        let language = self.session.language();
        let store = self.orchestrator.store();

        let instance = match store.lookup(language, element_id) {
            Some(element) => Instance::new(id, element, position),
            None => {
                let placeholder = store.fallback().placeholder_element(language);
                self.spawn_fetch(element_id);
                Instance::awaiting(id, element_id, placeholder, position)
            }
        };

        tracing::debug!(instance = %id, element = %element_id, "Placed instance");
        self.instances.push(instance);
        id
    }

    fn place_element(&mut self, element: Element, position: Position) -> InstanceId {
        let id = self.next_instance_id();
        let position = self.spatial.clamp(position);
        self.instances.push(Instance::new(id, element, position));
        id
    }

    fn spawn_fetch(&mut self, requested: ElementId) {
        if !self.awaiting_fetch.insert(requested) {
            return;
        }
        let orchestrator = self.orchestrator.clone();
        let language = self.session.language().clone();
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let element = orchestrator.fetch_element(&language, requested).await;
            let _ = tx.send(Fetched { requested, element }).await;
        });
    }

    /// Move an instance, clamped to the surface. Returns where it landed.
    pub fn move_to(&mut self, id: InstanceId, position: Position) -> Result<Position, WorkbenchError> {
        let position = self.spatial.clamp(position);
        let instance = self
            .instance_mut(id)
            .ok_or(WorkbenchError::UnknownInstance(id))?;
        instance.set_position(position);
        Ok(position)
    }

    /// Copy an instance at the configured duplicate offset.
    pub fn duplicate(&mut self, id: InstanceId) -> Result<InstanceId, WorkbenchError> {
        self.duplicate_by(id, self.settings.duplicate_offset)
    }

    pub fn duplicate_by(&mut self, id: InstanceId, offset: Offset) -> Result<InstanceId, WorkbenchError> {
        let source = self.instance(id).ok_or(WorkbenchError::UnknownInstance(id))?;
        let position = self.spatial.clamp(source.position().offset_by(offset));
        let source = source.clone();
        let copy_id = self.next_instance_id();
        self.instances.push(source.duplicate(copy_id, position));
        tracing::debug!(source = %id, copy = %copy_id, "Duplicated instance");
        Ok(copy_id)
    }

    /// Start combining two instances.
    ///
    /// Self-pairing and pairing an already `Paired` instance are refused and
    /// change nothing. On success both instances are `Paired` until the
    /// result is applied by [`Workbench::tick`].
    pub fn attempt_pair(
        &mut self,
        first: InstanceId,
        second: InstanceId,
    ) -> Result<PairId, WorkbenchError> {
        if first == second {
            tracing::debug!(instance = %first, "Ignoring self-pair");
            return Err(WorkbenchError::SelfPair(first));
        }

        let (element1_id, element2_id, anchor) = {
            let a = self
                .instance(first)
                .ok_or(WorkbenchError::UnknownInstance(first))?;
            let b = self
                .instance(second)
                .ok_or(WorkbenchError::UnknownInstance(second))?;
            if let Some(busy) = [a, b].into_iter().find(|i| !i.is_placed()) {
                tracing::debug!(instance = %busy.id(), "Ignoring pair with busy instance");
                return Err(WorkbenchError::AlreadyPaired(busy.id()));
            }
            (a.element_id(), b.element_id(), b.position())
        };

        let pair = PairId::new(self.next_pair);
        self.next_pair += 1;
        for id in [first, second] {
            if let Some(instance) = self.instance_mut(id) {
                instance.pair_with(pair);
            }
        }
        self.pairs.insert(
            pair,
            PendingPair {
                first,
                second,
                anchor,
            },
        );

        self.combines_in_flight += 1;
        let orchestrator = self.orchestrator.clone();
        let session = self.session.clone();
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = orchestrator
                .combine(&session, element1_id, element2_id)
                .await;
            let _ = tx.send(Completion { pair, result }).await;
        });

        tracing::debug!(%pair, %first, %second, "Started combination");
        Ok(pair)
    }

    /// Place an element and pair it onto the topmost `Placed` instance it
    /// lands on, if any.
    pub fn drop_element(&mut self, element_id: ElementId, position: Position) -> DropOutcome {
        let instance = self.place(element_id, position);
        DropOutcome {
            instance,
            pair: self.pair_on_overlap(instance),
        }
    }

    /// Finish dragging an instance: move it, then pair it onto whatever
    /// `Placed` instance it now overlaps.
    pub fn release(
        &mut self,
        id: InstanceId,
        position: Position,
    ) -> Result<Option<PairId>, WorkbenchError> {
        self.move_to(id, position)?;
        Ok(self.pair_on_overlap(id))
    }

    fn pair_on_overlap(&mut self, id: InstanceId) -> Option<PairId> {
        let target = self.instance(id)?;
        if !target.is_placed() {
            return None;
        }
        let other = self.spatial.topmost_overlap(self.instances.iter(), target)?;
        match self.attempt_pair(other, id) {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::debug!("Overlap did not start a pair: {e}");
                None
            }
        }
    }

    /// Remove every instance and pending display. In-flight combinations
    /// still finish and update the store, but nothing is materialized.
    pub fn clear(&mut self) {
        let removed = self.instances.len();
        self.instances.clear();
        self.pairs.clear();
        self.displays.clear();
        tracing::debug!(removed, "Cleared workbench");
    }

    /// Apply queued commands, finished fetches and combinations, and
    /// materialize results whose display interval has elapsed.
    pub fn tick(&mut self) -> Vec<WorkbenchNotice> {
        let mut notices = Vec::new();
        self.drain_commands(&mut notices);
        self.drain_fetches(&mut notices);
        self.drain_completions(&mut notices);
        self.materialize_due(Instant::now(), &mut notices);
        notices
    }

    fn default_drop_position(&self) -> Position {
        let bounds = self.spatial.bounds();
        let size = self.spatial.element_size();
        Position::new(
            (bounds.width - size.width) / 2.0,
            (bounds.height - size.height) / 2.0,
        )
    }

    fn drain_commands(&mut self, notices: &mut Vec<WorkbenchNotice>) {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                SurfaceCommand::Add {
                    element_id,
                    position,
                } => {
                    let position = position.unwrap_or_else(|| self.default_drop_position());
                    let instance = self.place(element_id, position);
                    notices.push(WorkbenchNotice::Added {
                        instance,
                        element_id,
                    });
                }
                SurfaceCommand::Clear => {
                    self.clear();
                    notices.push(WorkbenchNotice::Cleared);
                }
            }
        }
    }

    fn drain_fetches(&mut self, notices: &mut Vec<WorkbenchNotice>) {
        while let Ok(Fetched { requested, element }) = self.fetch_rx.try_recv() {
            self.awaiting_fetch.remove(&requested);
            let Some(element) = element else {
                notices.push(WorkbenchNotice::Unresolved {
                    element_id: requested,
                });
                continue;
            };

            let mut instances = 0;
            for instance in &mut self.instances {
                if instance.resolution() == Resolution::Awaiting(requested) {
                    instance.resolve(element.clone());
                    instances += 1;
                }
            }
            notices.push(WorkbenchNotice::Resolved { element, instances });
        }
    }

    fn drain_completions(&mut self, notices: &mut Vec<WorkbenchNotice>) {
        while let Ok(Completion { pair, result }) = self.completion_rx.try_recv() {
            self.combines_in_flight = self.combines_in_flight.saturating_sub(1);

            let Some(pending) = self.pairs.remove(&pair) else {
                tracing::debug!(%pair, "Combination finished after its sources were cleared");
                notices.push(WorkbenchNotice::Skipped { pair, result });
                continue;
            };

            if let Some(element) = result.element().cloned() {
                self.instances
                    .retain(|i| i.id() != pending.first && i.id() != pending.second);
                self.displays.push(PendingDisplay {
                    pair,
                    element,
                    position: pending.anchor,
                    due: Instant::now() + self.settings.display_interval,
                });
                notices.push(WorkbenchNotice::Combined { pair, result });
            } else {
                self.separate(&pending);
                notices.push(WorkbenchNotice::Declined {
                    pair,
                    error: result.error.unwrap_or_default(),
                });
            }
        }
    }

    /// Return a declined pair to `Placed` and nudge the second instance one
    /// element width away from the first.
    fn separate(&mut self, pending: &PendingPair) {
        let anchor = self.instance(pending.first).map(Instance::position);
        if let Some(first) = self.instance_mut(pending.first) {
            first.unpair();
        }
        let Some(second_position) = self.instance(pending.second).map(Instance::position) else {
            return;
        };

        let nudged = anchor.map(|anchor| self.nudge_away(anchor, second_position));
        if let Some(second) = self.instance_mut(pending.second) {
            second.unpair();
            if let Some(position) = nudged {
                second.set_position(position);
            }
        }
    }

    fn nudge_away(&self, anchor: Position, position: Position) -> Position {
        let width = self.spatial.element_size().width;
        let direction = if position.x >= anchor.x { 1.0 } else { -1.0 };
        let preferred = self
            .spatial
            .clamp(position.offset_by(Offset::new(direction * width, 0.0)));
        if !self.spatial.overlaps(anchor, preferred) {
            return preferred;
        }
        // Pinned against an edge; go to the other side of the anchor.
        self.spatial.clamp(Position::new(
            anchor.x - direction * width,
            position.y,
        ))
    }

    fn materialize_due(&mut self, now: Instant, notices: &mut Vec<WorkbenchNotice>) {
        let (due, waiting): (Vec<_>, Vec<_>) = mem::take(&mut self.displays)
            .into_iter()
            .partition(|display| display.due <= now);
        self.displays = waiting;

        for pending in due {
            let instance = self.place_element(pending.element, pending.position);
            tracing::debug!(pair = %pending.pair, %instance, "Materialized combination result");
            notices.push(WorkbenchNotice::Materialized {
                pair: pending.pair,
                instance,
            });
        }
    }
}
