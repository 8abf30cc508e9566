//! Per-room ephemeral workspace: a shared text buffer and a bounded stroke
//! log, each with its own monotonic version counter.
//!
//! The workspace lives inside the room's state and is serialized by the room
//! lock; nothing here is shared or locked on its own. It is dropped with the
//! room and never persisted.

use crate::error::HubError;
use collab_kit_protocol::{Point, Stroke, WorkspaceSnapshot};
use std::collections::VecDeque;

/// Strokes kept per room; older ones fall off the front.
pub const MAX_STROKES: usize = 1000;

const DEFAULT_STROKE_COLOR: &str = "#111827";
const DEFAULT_STROKE_SIZE: f64 = 2.0;
const DEFAULT_STROKE_TOOL: &str = "pen";

/// Stroke fields as received from a client, before defaults are filled.
#[derive(Debug, Clone, Default)]
pub struct StrokeInput {
    pub id: Option<String>,
    pub points: Vec<Point>,
    pub color: Option<String>,
    pub size: Option<f64>,
    pub tool: Option<String>,
}

/// Ephemeral collaborative state of one room.
#[derive(Debug, Default)]
pub struct Workspace {
    text: String,
    text_version: u64,
    strokes: VecDeque<Stroke>,
    stroke_version: u64,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the text buffer, last writer wins. Returns the new text
    /// version.
    pub fn apply_text(&mut self, content: String) -> u64 {
        self.text = content;
        self.text_version += 1;
        self.text_version
    }

    /// Append a stroke, filling omitted style fields with the board
    /// defaults. The stored stroke is returned for fan-out.
    ///
    /// A stroke without points carries no drawable content and is rejected
    /// as `EmptyPayload` without touching state.
    pub fn apply_stroke(
        &mut self,
        input: StrokeInput,
        author: &str,
        timestamp: u64,
    ) -> Result<Stroke, HubError> {
        if input.points.is_empty() {
            return Err(HubError::EmptyPayload);
        }

        self.stroke_version += 1;
        let stroke = Stroke {
            id: input
                .id
                .unwrap_or_else(|| format!("stroke-{}", self.stroke_version)),
            points: input.points,
            color: input.color.unwrap_or_else(|| DEFAULT_STROKE_COLOR.to_string()),
            size: input.size.unwrap_or(DEFAULT_STROKE_SIZE),
            tool: input.tool.unwrap_or_else(|| DEFAULT_STROKE_TOOL.to_string()),
            author: author.to_string(),
            timestamp,
        };

        self.strokes.push_back(stroke.clone());
        if self.strokes.len() > MAX_STROKES {
            self.strokes.pop_front();
        }

        Ok(stroke)
    }

    /// Empty the stroke log. The version keeps counting so stale clients
    /// can tell a clear from a missed stroke. Returns the new version.
    pub fn clear_strokes(&mut self) -> u64 {
        self.strokes.clear();
        self.stroke_version += 1;
        self.stroke_version
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_version(&self) -> u64 {
        self.text_version
    }

    pub fn stroke_version(&self) -> u64 {
        self.stroke_version
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    /// Full copy handed to a joiner for bootstrap.
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            text: self.text.clone(),
            text_version: self.text_version,
            strokes: self.strokes.iter().cloned().collect(),
            stroke_version: self.stroke_version,
        }
    }
}
