use std::collections::VecDeque;

use sentinel_core_types::NodeId;
use sentinel_page_dom::{Element, WeakElement};

/// One admitted element waiting for a dispatch slot.
#[derive(Clone, Debug)]
pub struct Job {
    pub node: NodeId,
    pub element: WeakElement,
    pub seq: u64,
}

impl Job {
    pub fn new(element: &Element, seq: u64) -> Self {
        Self {
            node: element.id(),
            element: element.downgrade(),
            seq,
        }
    }
}

/// Strict FIFO of admitted elements. Holds elements weakly so a removed
/// review does not stay alive just because it is waiting.
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    jobs: VecDeque<Job>,
    next_seq: u64,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: &Element) -> Job {
        let job = Job::new(element, self.next_seq);
        self.next_seq += 1;
        self.jobs.push_back(job.clone());
        job
    }

    pub fn pop(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.jobs.iter().any(|job| job.node == node)
    }
}
