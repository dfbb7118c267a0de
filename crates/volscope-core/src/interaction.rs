//! Slider drag state machine.

use crate::controls::{ControlId, ControlSet};

/// Pointer input in physical pixels, origin at the top-left of the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    CloseRequested,
}

/// State of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// A slider is being dragged.
    Dragging(ControlId),
    /// Terminal.
    Closed,
}

/// A control value that changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlChange {
    pub control: ControlId,
    pub value: f32,
}

/// What happened in response to an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionOutcome {
    /// A control value changed and must be applied before the next event.
    ControlChanged(ControlChange),
    /// The pointer went down outside every control; free for navigation.
    Unhandled,
    /// A drag ended.
    Released,
    /// The session was closed by this event.
    Closed,
    /// Nothing happened.
    Ignored,
}

/// Owns the sliders and tracks which one, if any, is being dragged.
#[derive(Debug, Clone)]
pub struct InteractionController {
    controls: ControlSet,
    state: InteractionState,
}

impl InteractionController {
    /// Creates an idle controller over `controls`.
    pub fn new(controls: ControlSet) -> Self {
        Self {
            controls,
            state: InteractionState::Idle,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Returns whether the controller reached `Closed`.
    pub fn is_closed(&self) -> bool {
        self.state == InteractionState::Closed
    }

    /// Returns the sliders.
    pub fn controls(&self) -> &ControlSet {
        &self.controls
    }

    /// Returns the sliders mutably, e.g. to relayout them.
    pub fn controls_mut(&mut self) -> &mut ControlSet {
        &mut self.controls
    }

    /// Requests the session to close.
    pub fn close(&mut self) -> InteractionOutcome {
        self.handle(PointerEvent::CloseRequested)
    }

    /// Advances the state machine by one event.
    pub fn handle(&mut self, event: PointerEvent) -> InteractionOutcome {
        if self.state == InteractionState::Closed {
            return InteractionOutcome::Ignored;
        }

        let outcome = match (self.state, event) {
            (_, PointerEvent::CloseRequested) => {
                self.state = InteractionState::Closed;
                InteractionOutcome::Closed
            }
            (InteractionState::Idle, PointerEvent::Down { x, y }) => {
                match self.controls.hit_test(x, y).map(|s| s.id) {
                    Some(id) => {
                        self.state = InteractionState::Dragging(id);
                        self.change(id, x)
                    }
                    None => InteractionOutcome::Unhandled,
                }
            }
            (InteractionState::Dragging(id), PointerEvent::Move { x, .. }) => self.change(id, x),
            (InteractionState::Dragging(_), PointerEvent::Up) => {
                self.state = InteractionState::Idle;
                InteractionOutcome::Released
            }
            _ => InteractionOutcome::Ignored,
        };

        if !matches!(outcome, InteractionOutcome::Ignored) {
            log::trace!("{event:?} -> {:?}", self.state);
        }
        outcome
    }

    fn change(&mut self, id: ControlId, x: f32) -> InteractionOutcome {
        match self.controls.set_from_pointer(id, x) {
            Some(value) => InteractionOutcome::ControlChanged(ControlChange { control: id, value }),
            None => InteractionOutcome::Ignored,
        }
    }
}
