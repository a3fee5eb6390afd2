//! Translates wall-clock time into `Slot`s and back.
//!
//! The Attestation Validators (component B) never read `SystemTime`
//! directly — they ask a `SlotClock` "what slot is it, with some tolerance
//! for clock drift", matching the teacher's
//! `attestation_verification.rs` calls to `now_with_future_tolerance` /
//! `now_with_past_tolerance`.

mod manual_slot_clock;
mod system_time_slot_clock;

pub use manual_slot_clock::ManualSlotClock;
pub use system_time_slot_clock::SystemTimeSlotClock;
pub use types::Slot;

use std::time::Duration;

pub trait SlotClock: Send + Sync + Sized + Clone {
    /// Creates a new clock with the given genesis time and slot duration.
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self;

    /// Returns the slot at the current time, or `None` if the current time
    /// is before genesis.
    fn now(&self) -> Option<Slot>;

    /// Returns `now()`, but also accepts times up to `tolerance` in the
    /// future as belonging to the current slot. Used to tolerate gossiping
    /// peers whose clocks run slightly ahead (mirrors the teacher's
    /// `MAXIMUM_GOSSIP_CLOCK_DISPARITY`).
    fn now_with_future_tolerance(&self, tolerance: Duration) -> Option<Slot> {
        self.now_with_offset(tolerance, true)
    }

    /// Symmetric to `now_with_future_tolerance`, for peers whose clocks run
    /// slightly behind.
    fn now_with_past_tolerance(&self, tolerance: Duration) -> Option<Slot> {
        self.now_with_offset(tolerance, false)
    }

    fn now_with_offset(&self, tolerance: Duration, is_future: bool) -> Option<Slot> {
        let now = self.now_duration()?;
        let adjusted = if is_future {
            now.checked_add(tolerance)?
        } else {
            now.checked_sub(tolerance).unwrap_or_default()
        };
        self.slot_of(adjusted)
    }

    /// Duration since genesis, or `None` if genesis is in the future.
    fn now_duration(&self) -> Option<Duration>;

    fn slot_of(&self, since_genesis: Duration) -> Option<Slot>;

    fn slot_duration(&self) -> Duration;

    /// Time remaining until the start of the next slot.
    fn duration_to_next_slot(&self) -> Option<Duration>;

    /// Time remaining until the start of `slot`, or `None` if `slot` has
    /// already started.
    fn duration_to_slot(&self, slot: Slot) -> Option<Duration>;

    fn start_of(&self, slot: Slot) -> Option<Duration>;
}
