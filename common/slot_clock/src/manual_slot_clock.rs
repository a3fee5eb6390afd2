use super::SlotClock;
use std::sync::RwLock;
use std::time::Duration;
use types::Slot;

/// A `SlotClock` whose "now" is set explicitly by tests, so a validator or
/// the Fork-Choice Gateway can be exercised against specific slots without
/// sleeping real wall-clock time (grounded in the teacher's ubiquitous use of
/// `ManualSlotClock` across `beacon_chain` unit tests).
pub struct ManualSlotClock {
    genesis_slot: Slot,
    genesis_duration: Duration,
    current_time: RwLock<Duration>,
    slot_duration: Duration,
}

impl Clone for ManualSlotClock {
    fn clone(&self) -> Self {
        Self {
            genesis_slot: self.genesis_slot,
            genesis_duration: self.genesis_duration,
            current_time: RwLock::new(*self.current_time.read().expect("lock not poisoned")),
            slot_duration: self.slot_duration,
        }
    }
}

impl ManualSlotClock {
    pub fn set_slot(&self, slot: u64) {
        let slot_duration = self.slot_duration;
        let new_time = self
            .genesis_duration
            .checked_add(Duration::from_millis(slot * slot_duration.as_millis() as u64))
            .expect("slot does not overflow");
        *self.current_time.write().expect("lock not poisoned") = new_time;
    }

    pub fn advance_slot(&self) {
        let slot = self.now().unwrap_or(self.genesis_slot);
        self.set_slot(slot.as_u64() + 1);
    }
}

impl SlotClock for ManualSlotClock {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self {
        Self {
            genesis_slot,
            genesis_duration,
            current_time: RwLock::new(genesis_duration),
            slot_duration,
        }
    }

    fn now(&self) -> Option<Slot> {
        let now = self.now_duration()?;
        self.slot_of(now)
    }

    fn now_duration(&self) -> Option<Duration> {
        let current = *self.current_time.read().expect("lock not poisoned");
        current.checked_sub(self.genesis_duration)
    }

    fn slot_of(&self, since_genesis: Duration) -> Option<Slot> {
        if self.slot_duration.as_millis() == 0 {
            return None;
        }
        let slots = since_genesis.as_millis() / self.slot_duration.as_millis();
        Some(self.genesis_slot + Slot::new(slots as u64))
    }

    fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    fn duration_to_next_slot(&self) -> Option<Duration> {
        let now = self.now_duration()?;
        let slot_millis = self.slot_duration.as_millis();
        if slot_millis == 0 {
            return None;
        }
        let elapsed_in_slot = now.as_millis() % slot_millis;
        Some(Duration::from_millis((slot_millis - elapsed_in_slot) as u64))
    }

    fn duration_to_slot(&self, slot: Slot) -> Option<Duration> {
        let now = self.now_duration()?;
        let target = self.start_of(slot)?;
        target.checked_sub(now)
    }

    fn start_of(&self, slot: Slot) -> Option<Duration> {
        let slots_since_genesis = slot.saturating_sub(self.genesis_slot).as_u64();
        let millis = slots_since_genesis.checked_mul(self.slot_duration.as_millis() as u64)?;
        Some(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_slot_then_now() {
        let clock = ManualSlotClock::new(Slot::new(0), Duration::from_secs(0), Duration::from_secs(12));
        clock.set_slot(9);
        assert_eq!(clock.now(), Some(Slot::new(9)));
    }

    #[test]
    fn advance_slot_increments() {
        let clock = ManualSlotClock::new(Slot::new(0), Duration::from_secs(0), Duration::from_secs(12));
        clock.advance_slot();
        assert_eq!(clock.now(), Some(Slot::new(1)));
    }
}
