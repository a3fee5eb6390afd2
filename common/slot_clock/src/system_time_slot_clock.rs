use super::SlotClock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use types::Slot;

/// A `SlotClock` backed by the operating system's wall-clock time.
#[derive(Clone)]
pub struct SystemTimeSlotClock {
    genesis_slot: Slot,
    genesis_duration: Duration,
    slot_duration: Duration,
}

impl SystemTimeSlotClock {
    fn system_time_now(&self) -> Option<Duration> {
        SystemTime::now().duration_since(UNIX_EPOCH).ok()
    }
}

impl SlotClock for SystemTimeSlotClock {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self {
        Self {
            genesis_slot,
            genesis_duration,
            slot_duration,
        }
    }

    fn now(&self) -> Option<Slot> {
        let now = self.now_duration()?;
        self.slot_of(now)
    }

    fn now_duration(&self) -> Option<Duration> {
        self.system_time_now()?.checked_sub(self.genesis_duration)
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
