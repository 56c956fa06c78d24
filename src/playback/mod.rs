/// Play/pause/seek/loop state machine.
pub mod controller;
