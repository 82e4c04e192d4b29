use std::fmt;

use serde::{Deserialize, Serialize};

/// Text slots supplied by the shape/address planning collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeSlot {
    ShapeEval,
    InputAddrCalculator,
    OutputAddrCalculator,
    ExtraShape,
    InputOutputChecks,
    /// Initializer list of each instance's `Arguments`
    ProblemArgs,
    /// File-scope code emitted ahead of the instances
    ExtraCode,
}

impl ShapeSlot {
    pub const ALL: [ShapeSlot; 7] = [
        ShapeSlot::ShapeEval,
        ShapeSlot::InputAddrCalculator,
        ShapeSlot::OutputAddrCalculator,
        ShapeSlot::ExtraShape,
        ShapeSlot::InputOutputChecks,
        ShapeSlot::ProblemArgs,
        ShapeSlot::ExtraCode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShapeSlot::ShapeEval            => "shape_eval",
            ShapeSlot::InputAddrCalculator  => "input_addr_calculator",
            ShapeSlot::OutputAddrCalculator => "output_addr_calculator",
            ShapeSlot::ExtraShape           => "extra_shape",
            ShapeSlot::InputOutputChecks    => "input_output_checks",
            ShapeSlot::ProblemArgs          => "problem_args",
            ShapeSlot::ExtraCode            => "extra_code",
        }
    }
}

impl fmt::Display for ShapeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source of the shape/address fragments. Their content is opaque here:
/// the synthesizer only positions it.
pub trait ShapePlanner {
    fn render(&self, slot: ShapeSlot) -> String;
}

/// Fragments already rendered to text, e.g. read from a request file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannedShapes {
    pub shape_eval:             String,
    pub input_addr_calculator:  String,
    pub output_addr_calculator: String,
    pub extra_shape:            String,
    pub input_output_checks:    String,
    pub problem_args:           String,
    pub extra_code:             String,
}

impl ShapePlanner for PlannedShapes {
    fn render(&self, slot: ShapeSlot) -> String {
        match slot {
            ShapeSlot::ShapeEval            => &self.shape_eval,
            ShapeSlot::InputAddrCalculator  => &self.input_addr_calculator,
            ShapeSlot::OutputAddrCalculator => &self.output_addr_calculator,
            ShapeSlot::ExtraShape           => &self.extra_shape,
            ShapeSlot::InputOutputChecks    => &self.input_output_checks,
            ShapeSlot::ProblemArgs          => &self.problem_args,
            ShapeSlot::ExtraCode            => &self.extra_code,
        }
        .clone()
    }
}
