//! Application-level orchestration for the interactive UI.
//!
//! The controller owns every core call made on behalf of the UI; the UI thread
//! only sends commands and renders the events that come back.

mod controller;
mod snapshot;

pub(crate) use controller::{run_controller, AppEvent, UiCommand};
pub(crate) use snapshot::Snapshot;
