use super::schedule::SetpointSchedule;
use super::types::StepInput;

/// Setpoints requested for the coming step. `None` leaves the port as is.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Setpoint {
    pub p3_kw: Option<f64>,
    pub q3_kvar: Option<f64>,
}

/// Decides port setpoints once per step.
pub trait Controller {
    fn setpoint(&mut self, input: &StepInput) -> Setpoint;
}

/// Never sends a setpoint; sessions charge at their default rate.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uncontrolled;

impl Controller for Uncontrolled {
    fn setpoint(&mut self, _input: &StepInput) -> Setpoint {
        Setpoint::default()
    }
}

/// Follows repeating P3/Q3 schedules while a session is active.
#[derive(Debug, Default, Clone)]
pub struct ScheduledSetpoint {
    p3_kw: SetpointSchedule,
    q3_kvar: SetpointSchedule,
}

impl ScheduledSetpoint {
    pub fn new(p3_kw: SetpointSchedule, q3_kvar: SetpointSchedule) -> Self {
        Self { p3_kw, q3_kvar }
    }
}

impl Controller for ScheduledSetpoint {
    fn setpoint(&mut self, input: &StepInput) -> Setpoint {
        if !input.occupied {
            return Setpoint::default();
        }
        Setpoint {
            p3_kw: self.p3_kw.at(input.timestep),
            q3_kvar: self.q3_kvar.at(input.timestep),
        }
    }
}
