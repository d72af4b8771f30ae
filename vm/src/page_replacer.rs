use crate::config::Policy;

/// Picks which slot of a fixed-size table gets overwritten next.
///
/// `last_access` yields the last access timestamp of every slot, in slot
/// order. Policies that ignore access history never pull from it.
pub trait PageReplacer {
    fn pick_replacement(&mut self, last_access: &mut dyn Iterator<Item = u64>) -> usize;
}

/// Rotating cursor: `0, 1, ..., slots - 1, 0, ...`. This is not FIFO, it
/// never looks at when a slot was filled.
pub struct RoundRobinReplacer {
    cursor: usize,
    slots: usize,
}

impl RoundRobinReplacer {
    pub fn new(slots: usize) -> Self {
        RoundRobinReplacer { cursor: 0, slots }
    }
}

impl PageReplacer for RoundRobinReplacer {
    fn pick_replacement(&mut self, _last_access: &mut dyn Iterator<Item = u64>) -> usize {
        let victim = self.cursor;
        self.cursor = (self.cursor + 1) % self.slots.max(1);

        victim
    }
}

/// Oldest timestamp wins; ties go to the lowest index.
pub struct LruReplacer;

impl PageReplacer for LruReplacer {
    fn pick_replacement(&mut self, last_access: &mut dyn Iterator<Item = u64>) -> usize {
        let mut victim = 0;
        let mut oldest = u64::MAX;

        for (idx, stamp) in last_access.enumerate() {
            if stamp < oldest {
                oldest = stamp;
                victim = idx;
            }
        }

        victim
    }
}

pub fn replacer_for(policy: Policy, slots: usize) -> Box<dyn PageReplacer> {
    match policy {
        Policy::RoundRobin => Box::new(RoundRobinReplacer::new(slots)),
        Policy::LeastRecentlyUsed => Box::new(LruReplacer),
    }
}
