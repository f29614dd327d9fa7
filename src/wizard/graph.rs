// Live-graph sample buffer for the measuring and results screens
//
// One byte per horizontal pixel, holding the column height for that pixel.
// Columns are filled left to right as the sweep progresses; samples are
// positioned by sweep-completion fraction and linearly interpolated between
// the previously filled column and the new one. Writes are monotonic-max
// per column, so a resonance spike stays visible even after the sweep moves
// past its frequency bucket.

/// Graph width in pixels; matches the measuring-screen layout
pub const GRAPH_WIDTH: usize = 240;

/// Graph height in pixels; column values stay below this
pub const GRAPH_HEIGHT: u8 = 64;

/// Accumulated live-graph columns for one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphBuffer {
    columns: [u8; GRAPH_WIDTH],
    filled: usize,
}

impl GraphBuffer {
    pub fn new() -> Self {
        Self {
            columns: [0; GRAPH_WIDTH],
            filled: 0,
        }
    }

    /// Reset for a new sweep
    pub fn clear(&mut self) {
        self.columns = [0; GRAPH_WIDTH];
        self.filled = 0;
    }

    /// Record one sample
    ///
    /// `overall_progress` (0-1) positions the sample horizontally;
    /// `amplitude_norm` (0-1) scales the column height. Existing columns are
    /// only ever raised, never lowered.
    pub fn push(&mut self, overall_progress: f32, amplitude_norm: f32) {
        let end = ((overall_progress * GRAPH_WIDTH as f32).ceil() as isize)
            .clamp(0, GRAPH_WIDTH as isize) as usize;

        let end_val = amplitude_norm.clamp(0.0, 1.0) * GRAPH_HEIGHT as f32;
        let (start, start_val) = if self.filled == 0 {
            (end.saturating_sub(1), end_val)
        } else {
            let start = end.clamp(1, self.filled) - 1;
            (start, self.columns[start] as f32)
        };

        for i in start..end {
            let t = if end > start + 1 {
                (i - start) as f32 / (end - start) as f32
            } else {
                1.0
            };
            let value = (start_val + (end_val - start_val) * t)
                .clamp(0.0, (GRAPH_HEIGHT - 1) as f32) as u8;
            self.columns[i] = self.columns[i].max(value);
        }

        self.filled = self.filled.max(end);
    }

    /// All columns, including the not-yet-filled tail
    pub fn columns(&self) -> &[u8; GRAPH_WIDTH] {
        &self.columns
    }

    /// Copy of the columns for a phase snapshot
    pub fn as_array(&self) -> [u8; GRAPH_WIDTH] {
        self.columns
    }

    /// Number of columns filled so far
    pub fn filled(&self) -> usize {
        self.filled
    }
}

impl Default for GraphBuffer {
    fn default() -> Self {
        Self::new()
    }
}
