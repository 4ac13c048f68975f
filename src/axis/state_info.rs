use super::state::MotionState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisStatus {
    pub state: MotionState,
    pub position: f64,
    pub encoder: i64,
}

impl AxisStatus {
    pub fn new(state: MotionState, position: f64, encoder: i64) -> Self {
        Self {
            state,
            position,
            encoder,
        }
    }

    pub fn describe(&self, units: &str) -> String {
        format!("{}, {}{}", self.state, format_position(self.position), units)
    }
}

pub fn format_position(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    // avoid printing "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}
