//! Translator app: the controller runtime that runs core effects against
//! the engine's collaborators, plus document persistence.
mod alerts;
mod controller;
mod document;

pub use alerts::{AlertSink, StderrAlertSink};
pub use controller::{map_model_error, Command, Controller, ControllerConfig, ControllerHandle};
pub use document::{load_document, save_document, DocumentError};
