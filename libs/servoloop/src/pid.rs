
#[derive(Debug, Clone, Copy)]
pub struct PidConfiguration {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,

    /// Symmetric output saturation: compute() never leaves
    /// [-max_output, +max_output]
    pub max_output: f32,
}

pub struct Pid {
    configuration: PidConfiguration,

    integral: f32,
    last_error: f32,

    output: f32,
}

impl Pid {
    pub fn new(configuration: PidConfiguration) -> Pid {
        Pid {
            configuration,

            integral: 0.0,
            last_error: 0.0,

            output: 0.0,
        }
    }

    pub fn set_configuration(&mut self, configuration: PidConfiguration) {
        self.configuration = configuration;
    }

    pub fn compute(&mut self, error: f32) -> f32 {
        //TODO anti-windup clamp on the integral term; the accumulator is
        //currently unbounded and only the output is saturated
        self.integral += error;

        let derivative = error - self.last_error;
        self.last_error = error;

        let output = self.configuration.kp * error
            + self.configuration.ki * self.integral
            + self.configuration.kd * derivative;

        self.output = output.clamp(
            -self.configuration.max_output,
            self.configuration.max_output,
        );

        self.output
    }

    pub fn output(&self) -> f32 {
        self.output
    }
}
