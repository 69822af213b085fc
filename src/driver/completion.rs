//! Tracking of which required inputs the pending row already has

/// Required input of a GCP table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredInput {
    PixelBase,
    LineBase,
    PixelWarp,
    LineWarp,
    GeometryBase,
    GeometryWarp,
}

/// Inputs set at least once on the last row of the table
///
/// A field is only ever switched on; the struct is reset when a new row is
/// appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCompletion {
    pub pixel_base: bool,
    pub line_base: bool,
    pub pixel_warp: bool,
    pub line_warp: bool,
    pub geometry_base: bool,
    pub geometry_warp: bool,
}

impl RowCompletion {
    /// Every input set
    pub fn all() -> Self {
        RowCompletion {
            pixel_base: true,
            line_base: true,
            pixel_warp: true,
            line_warp: true,
            geometry_base: true,
            geometry_warp: true,
        }
    }

    /// Completion with only the given inputs set
    pub fn of(inputs: &[RequiredInput]) -> Self {
        let mut completion = RowCompletion::default();
        for input in inputs {
            completion.mark(*input);
        }
        completion
    }

    /// Record that an input was set
    pub fn mark(&mut self, input: RequiredInput) {
        match input {
            RequiredInput::PixelBase => self.pixel_base = true,
            RequiredInput::LineBase => self.line_base = true,
            RequiredInput::PixelWarp => self.pixel_warp = true,
            RequiredInput::LineWarp => self.line_warp = true,
            RequiredInput::GeometryBase => self.geometry_base = true,
            RequiredInput::GeometryWarp => self.geometry_warp = true,
        }
    }

    pub fn is_set(&self, input: RequiredInput) -> bool {
        match input {
            RequiredInput::PixelBase => self.pixel_base,
            RequiredInput::LineBase => self.line_base,
            RequiredInput::PixelWarp => self.pixel_warp,
            RequiredInput::LineWarp => self.line_warp,
            RequiredInput::GeometryBase => self.geometry_base,
            RequiredInput::GeometryWarp => self.geometry_warp,
        }
    }

    /// True when every input set in `required` is also set here
    pub fn satisfies(&self, required: &RowCompletion) -> bool {
        (!required.pixel_base || self.pixel_base)
            && (!required.line_base || self.line_base)
            && (!required.pixel_warp || self.pixel_warp)
            && (!required.line_warp || self.line_warp)
            && (!required.geometry_base || self.geometry_base)
            && (!required.geometry_warp || self.geometry_warp)
    }

    pub fn reset(&mut self) {
        *self = RowCompletion::default();
    }
}
