//! Seams toward the hardware collaborators. Board crates implement
//! these; the pipeline only ever talks through them.

/// An angle input sampled by a sampler task.
pub trait AngleSource {
    /// Latest decoded angle, already mapped into the configured range.
    fn angle(&self) -> u16;
}

/// DC motor power stage (PWM duty plus two direction lines).
pub trait Motor {
    type Error;

    fn set_direction(&mut self, forward: bool) -> Result<(), Self::Error>;

    /// Duty in [0, max_duty]; the caller guarantees the bound.
    fn set_speed(&mut self, duty: u32) -> Result<(), Self::Error>;

    /// Release both direction lines and zero the duty. Distinct from
    /// driving at zero duty, which can brake or heat the motor on some
    /// bridge topologies.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

/// Text status display.
pub trait StatusDisplay {
    type Error;

    fn init(&mut self, width: u32, height: u32) -> Result<(), Self::Error>;

    fn clear(&mut self) -> Result<(), Self::Error>;

    fn draw_text(&mut self, line: u8, text: &str) -> Result<(), Self::Error>;
}
