//! Rendering unit.
//!
//! Purely observational: hands each finished step to a [`Renderer`] and
//! never touches the frame or counters. Renderer failures propagate.

use super::{StepFrame, Unit, UnitKind};
use crate::core::run_state::RunState;
use crate::error::UnitError;

/// Display backend.
pub trait Renderer {
    fn render(&mut self, state: &RunState, frame: &StepFrame) -> Result<(), String>;

    /// Release display resources.
    fn close(&mut self) -> Result<(), String> {
        Ok(())
    }
}

pub struct RenderUnit {
    name: String,
    renderer: Box<dyn Renderer>,
}

impl RenderUnit {
    pub fn new(name: impl Into<String>, renderer: Box<dyn Renderer>) -> Self {
        Self {
            name: name.into(),
            renderer,
        }
    }
}

impl Unit for RenderUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Render
    }

    fn post_step(&mut self, state: &RunState, frame: &mut StepFrame) -> Result<(), UnitError> {
        self.renderer
            .render(state, frame)
            .map_err(|e| UnitError::Collaborator(format!("renderer: {}", e)))
    }

    fn close(&mut self) -> Result<(), UnitError> {
        self.renderer
            .close()
            .map_err(|e| UnitError::Collaborator(format!("renderer: {}", e)))
    }
}
