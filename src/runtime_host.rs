use crate::runtime::Runtime;
use crate::world::EntityId;

/// Describes the current run state of the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// No live session token; initial state and the state after Stop.
    Idle,
    /// A session token is live and scripts may be executing under it.
    Running,
}

/// Operator actions the surrounding editor can trigger.
pub trait RuntimeHost {
    /// Current run state.
    fn play_state(&self) -> PlayState;

    /// Green flag: restart every `when flag clicked` script.
    fn start_run(&self) -> usize;

    /// Stop sign: cancel every script and reset sprites.
    fn stop_run(&self);

    /// Add a sprite from a name typed by the operator.
    fn add_entity(&self, raw_name: &str) -> Option<EntityId>;

    /// Send a broadcast from outside any script.
    fn trigger_broadcast(&self, message: &str) -> usize;

    /// Switch the entity being edited.
    fn select_entity(&self, id: EntityId) -> bool;

    /// Replace the document in the editing workspace.
    fn edit_workspace(&self, document: &str);

    /// Drop a sprite at a pointer position.
    fn drag_entity(&self, id: EntityId, x: f64, y: f64) -> bool;
}

impl RuntimeHost for Runtime {
    fn play_state(&self) -> PlayState {
        Runtime::play_state(self)
    }

    fn start_run(&self) -> usize {
        self.run()
    }

    fn stop_run(&self) {
        self.stop();
    }

    fn add_entity(&self, raw_name: &str) -> Option<EntityId> {
        self.add_sprite(raw_name)
    }

    fn trigger_broadcast(&self, message: &str) -> usize {
        self.broadcast(message)
    }

    fn select_entity(&self, id: EntityId) -> bool {
        self.world_mut().set_active(id)
    }

    fn edit_workspace(&self, document: &str) {
        self.world_mut().set_workspace(document);
    }

    fn drag_entity(&self, id: EntityId, x: f64, y: f64) -> bool {
        self.world_mut().drag_to(id, x, y)
    }
}
