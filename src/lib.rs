//! Core of a UTAU-style singing synthesis editor: songs made of lyric notes,
//! their pitch curves, and the UST project files they are stored in.

pub mod curve;
pub mod history;
pub mod note;
pub mod pianoroll;
pub mod portamento;
pub mod registry;
pub mod song;
pub mod ust;

// Utility modules
pub mod pitch;
