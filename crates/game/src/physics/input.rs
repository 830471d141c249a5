use bitflags::bitflags;

use crate::net::{CarInput, Pedal, PedalInput, Steer};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pedals: u8 {
        const GAS = 1 << 0;
        const BRAKE = 1 << 1;
    }
}

impl From<Pedal> for Pedals {
    fn from(pedal: Pedal) -> Self {
        match pedal {
            Pedal::Gas => Pedals::GAS,
            Pedal::Brake => Pedals::BRAKE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerInput {
    pub steer: Steer,
    pub pedals: Pedals,
}

impl PlayerInput {
    pub fn gas(&self) -> bool {
        self.pedals.contains(Pedals::GAS)
    }

    pub fn brake(&self) -> bool {
        self.pedals.contains(Pedals::BRAKE)
    }
}

/// Single-slot cell holding the latest input of one player. Writes overwrite,
/// there is no queue: steering and pedals are continuous state.
#[derive(Debug, Clone, Default)]
pub struct InputMailbox {
    slot: PlayerInput,
    unread: bool,
    overwritten: u64,
}

impl InputMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post_steer(&mut self, steer: Steer) {
        self.slot.steer = steer;
        self.mark_written();
    }

    pub fn post_pedal(&mut self, pedal: Pedal, is_down: bool) {
        self.slot.pedals.set(pedal.into(), is_down);
        self.mark_written();
    }

    pub fn post_car_input(&mut self, input: &CarInput) {
        self.post_steer(input.steer);
    }

    pub fn post_pedal_input(&mut self, input: &PedalInput) {
        self.post_pedal(input.pedal, input.is_down);
    }

    /// Drops everything held: steer centered, pedals up.
    pub fn release(&mut self) {
        self.slot = PlayerInput::default();
        self.mark_written();
    }

    pub fn read(&mut self) -> PlayerInput {
        self.unread = false;
        self.slot
    }

    pub fn peek(&self) -> PlayerInput {
        self.slot
    }

    pub fn has_unread(&self) -> bool {
        self.unread
    }

    /// Writes that landed on top of an unread value.
    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }

    fn mark_written(&mut self) {
        if self.unread {
            self.overwritten += 1;
        }
        self.unread = true;
    }
}
