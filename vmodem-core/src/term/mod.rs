//! Terminal-side input handling: command-line editing in command mode and
//! escape detection in online mode.

pub mod escape;
pub mod line_editor;
