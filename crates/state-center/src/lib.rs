use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::to_writer_pretty;
use sentinel_core_types::{ElementStatus, NodeId, PredictionResponse};
use sentinel_page_dom::{Element, WeakElement};

/// Lifecycle record for one review element.
#[derive(Clone, Debug, Default)]
pub struct ElementState {
    pub status: ElementStatus,
    /// Inline UI fragment owned by the renderer.
    pub slot: Option<Element>,
    /// Present only once `status` is `done`.
    pub response: Option<PredictionResponse>,
}

#[derive(Debug)]
struct Entry {
    element: WeakElement,
    state: ElementState,
}

/// One recorded status change.
#[derive(Clone, Debug)]
pub struct StateTransition {
    pub node: NodeId,
    pub from: ElementStatus,
    pub to: ElementStatus,
    pub recorded_at: SystemTime,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RegistryStats {
    pub registered: u64,
    pub queued: u64,
    pub processing: u64,
    pub done: u64,
    pub errors: u64,
    pub evicted: u64,
    pub rejected_transitions: u64,
}

#[derive(Debug)]
struct BoundedRing<T> {
    capacity: usize,
    data: VecDeque<T>,
}

impl<T: Clone> BoundedRing<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            data: VecDeque::new(),
        }
    }

    fn push(&mut self, item: T) {
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(item);
    }

    fn snapshot(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }
}

/// Associates each live review element with its [`ElementState`].
///
/// Entries hold the element weakly. Once nothing else keeps a node alive,
/// [`ElementStateRegistry::evict_dropped`] reclaims its entry.
pub struct ElementStateRegistry {
    entries: DashMap<NodeId, Entry>,
    history: Mutex<BoundedRing<StateTransition>>,
    stats: Mutex<RegistryStats>,
}

impl Default for ElementStateRegistry {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ElementStateRegistry {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            history: Mutex::new(BoundedRing::new(history_capacity)),
            stats: Mutex::new(RegistryStats::default()),
        }
    }

    /// Creates an idle entry unless one already exists. Returns `true` when
    /// the element was not tracked before.
    pub fn register(&self, element: &Element) -> bool {
        let mut created = false;
        self.entries.entry(element.id()).or_insert_with(|| {
            created = true;
            Entry {
                element: element.downgrade(),
                state: ElementState::default(),
            }
        });
        if created {
            self.stats.lock().registered += 1;
        }
        created
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    pub fn status(&self, node: NodeId) -> Option<ElementStatus> {
        self.entries.get(&node).map(|entry| entry.state.status)
    }

    pub fn state(&self, node: NodeId) -> Option<ElementState> {
        self.entries.get(&node).map(|entry| entry.state.clone())
    }

    pub fn element(&self, node: NodeId) -> Option<Element> {
        self.entries.get(&node).and_then(|entry| entry.element.upgrade())
    }

    /// `idle -> queued`, attaching the renderer's slot.
    pub fn mark_queued(&self, node: NodeId, slot: Element) -> bool {
        self.advance(node, ElementStatus::Queued, |state| {
            state.slot = Some(slot);
        })
    }

    /// `queued -> processing`.
    pub fn begin_processing(&self, node: NodeId) -> bool {
        self.advance(node, ElementStatus::Processing, |_| {})
    }

    /// `processing -> done`. Returns the slot to render into, or `None` when
    /// the transition was refused or the entry is gone.
    pub fn complete(&self, node: NodeId, response: PredictionResponse) -> Option<Element> {
        let is_error = response.is_error();
        let mut slot = None;
        let advanced = self.advance(node, ElementStatus::Done, |state| {
            state.response = Some(response);
            slot = state.slot.clone();
        });
        if advanced && is_error {
            self.stats.lock().errors += 1;
        }
        slot
    }

    fn advance(
        &self,
        node: NodeId,
        target: ElementStatus,
        apply: impl FnOnce(&mut ElementState),
    ) -> bool {
        let from = {
            let Some(mut entry) = self.entries.get_mut(&node) else {
                return false;
            };
            let from = entry.state.status;
            if !from.can_advance_to(target) {
                drop(entry);
                self.stats.lock().rejected_transitions += 1;
                return false;
            }
            entry.state.status = target;
            apply(&mut entry.state);
            from
        };
        self.history.lock().push(StateTransition {
            node,
            from,
            to: target,
            recorded_at: SystemTime::now(),
        });
        let mut stats = self.stats.lock();
        match target {
            ElementStatus::Queued => stats.queued += 1,
            ElementStatus::Processing => stats.processing += 1,
            ElementStatus::Done => stats.done += 1,
            ElementStatus::Idle => {}
        }
        true
    }

    /// Drops entries whose element has been reclaimed. A node that is only
    /// detached keeps its state, so re-inserting it does not re-score it.
    pub fn evict_dropped(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.element.is_alive());
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            self.stats.lock().evicted += evicted as u64;
        }
        evicted
    }

    /// Forgets every `done` element so discovery treats it as new again.
    /// Returns the slots that were attached to the forgotten entries.
    pub fn reset_done(&self) -> Vec<Element> {
        let mut slots = Vec::new();
        self.entries.retain(|_, entry| {
            if entry.state.status != ElementStatus::Done {
                return true;
            }
            if let Some(slot) = entry.state.slot.take() {
                slots.push(slot);
            }
            false
        });
        slots
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, status: ElementStatus) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.state.status == status)
            .count()
    }

    pub fn history(&self) -> Vec<StateTransition> {
        self.history.lock().snapshot()
    }

    /// Status changes recorded for one node, oldest first.
    pub fn history_for(&self, node: NodeId) -> Vec<ElementStatus> {
        self.history
            .lock()
            .data
            .iter()
            .filter(|transition| transition.node == node)
            .map(|transition| transition.to)
            .collect()
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats.lock().clone()
    }

    pub fn write_snapshot<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut elements: Vec<SerializableElementState> = self
            .entries
            .iter()
            .map(|entry| SerializableElementState {
                node: entry.key().to_string(),
                status: entry.state.status,
                alive: entry.element.is_alive(),
                response: entry.state.response.clone(),
            })
            .collect();
        elements.sort_by(|a, b| a.node.cmp(&b.node));
        let snapshot = RegistrySnapshot {
            stats: self.stats(),
            elements,
            transitions: self
                .history()
                .iter()
                .map(SerializableTransition::from)
                .collect(),
        };
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, &snapshot)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct RegistrySnapshot {
    stats: RegistryStats,
    elements: Vec<SerializableElementState>,
    transitions: Vec<SerializableTransition>,
}

#[derive(Serialize)]
struct SerializableElementState {
    node: String,
    status: ElementStatus,
    alive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<PredictionResponse>,
}

#[derive(Serialize)]
struct SerializableTransition {
    node: String,
    from: ElementStatus,
    to: ElementStatus,
    timestamp_ms: u128,
}

impl From<&StateTransition> for SerializableTransition {
    fn from(value: &StateTransition) -> Self {
        Self {
            node: value.node.to_string(),
            from: value.from,
            to: value.to,
            timestamp_ms: timestamp_ms(value.recorded_at),
        }
    }
}

fn timestamp_ms(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
