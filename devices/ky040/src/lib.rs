use core::cell::RefCell;

use critical_section::Mutex;

#[cfg(target_os = "espidf")]
pub mod esp;

/// KY-040 rotary encoder decoder
///
/// The decoder keeps a signed tick counter wrapped into the configured
/// angle span. All state updates happen inside an interrupt-disabling
/// critical section: the rotation and push-button edges arrive in
/// interrupt context and the readers run in task context, so a
/// scheduler-aware lock is not an option here.
pub struct EncoderCore {
    state: Mutex<RefCell<EncoderState>>,
}

/// Largest number of distinct angle values a single encoder may cover.
pub const MAX_SPAN: u32 = 65535;

#[derive(Debug, Clone, Copy)]
pub struct Ky040Config {
    /// Lowest reported angle (inclusive)
    pub angle_min: u16,
    /// Highest reported angle (inclusive)
    pub angle_max: u16,
    /// Minimum time between two accepted rotation edges, 0 disables the gate
    pub debounce_us: u32,
    /// Invert the rotation direction
    pub reverse: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ky040Error {
    /// `angle_max` below `angle_min`, or the span does not fit in 16 bits
    InvalidAngleRange { angle_min: u16, angle_max: u16 },
    /// GPIO or interrupt service setup failed (raw esp error code)
    Hardware(i32),
}

impl core::fmt::Display for Ky040Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Ky040Error::InvalidAngleRange { angle_min, angle_max } => {
                write!(f, "invalid angle range [{angle_min}, {angle_max}]")
            }
            Ky040Error::Hardware(code) => write!(f, "hardware setup failed (code {code})"),
        }
    }
}

struct EncoderState {
    ticks: i32,
    angle_min: u16,
    angle_max: u16,
    span: u16,
    debounce_us: u32,
    reverse: bool,
    last_edge_us: i64,
}

//wrap an intermediate tick value back into [0, span), also for negative values
fn wrap_ticks(ticks: i32, span: u16) -> i32 {
    let span = span as i32;
    let wrapped = ticks % span;
    if wrapped < 0 {
        wrapped + span
    } else {
        wrapped
    }
}

fn checked_span(angle_min: u16, angle_max: u16) -> Result<u16, Ky040Error> {
    if angle_max < angle_min {
        return Err(Ky040Error::InvalidAngleRange { angle_min, angle_max });
    }
    let span = angle_max as u32 - angle_min as u32 + 1;
    if span > MAX_SPAN {
        return Err(Ky040Error::InvalidAngleRange { angle_min, angle_max });
    }
    Ok(span as u16)
}

impl EncoderCore {
    /// Create a decoder with the tick counter at zero.
    ///
    /// `now_us` seeds the debounce timestamp, so edges arriving within
    /// the debounce window of creation are dropped like any other bounce.
    pub fn new(config: &Ky040Config, now_us: i64) -> Result<Self, Ky040Error> {
        let span = checked_span(config.angle_min, config.angle_max)?;
        Ok(Self {
            state: Mutex::new(RefCell::new(EncoderState {
                ticks: 0,
                angle_min: config.angle_min,
                angle_max: config.angle_max,
                span,
                debounce_us: config.debounce_us,
                reverse: config.reverse,
                last_edge_us: now_us,
            })),
        })
    }

    /// Feed one rising edge of the rotation clock input.
    ///
    /// `partner_high` is the level of the quadrature partner (DT) input
    /// at the time of the edge: low means one tick clockwise, high one
    /// tick counter-clockwise. Edges inside the debounce window are
    /// dropped without touching any state. Safe to call from interrupt
    /// context; never fails.
    pub fn clock_edge(&self, partner_high: bool, now_us: i64) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.debounce_us != 0 && now_us - state.last_edge_us < state.debounce_us as i64 {
                return;
            }
            state.last_edge_us = now_us;
            let mut delta = if partner_high { -1 } else { 1 };
            if state.reverse {
                delta = -delta;
            }
            state.ticks = wrap_ticks(state.ticks + delta, state.span);
        });
    }

    /// Feed one falling edge of the push button: re-zero the counter.
    pub fn button_edge(&self) {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).ticks = 0;
        });
    }

    /// Raw tick counter, always in [0, span).
    pub fn ticks(&self) -> i32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).ticks)
    }

    /// Current angle in [angle_min, angle_max].
    ///
    /// The value may be a few microseconds stale relative to an edge
    /// that is being handled concurrently.
    pub fn angle(&self) -> u16 {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            state.angle_min + state.ticks as u16
        })
    }

    /// Change the angle range, rescaling the current tick value into the
    /// new span via modulo rather than clamping it.
    pub fn set_range(&self, angle_min: u16, angle_max: u16) -> Result<(), Ky040Error> {
        let span = checked_span(angle_min, angle_max)?;
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.angle_min = angle_min;
            state.angle_max = angle_max;
            state.span = span;
            state.ticks = wrap_ticks(state.ticks, span);
        });
        Ok(())
    }

    /// Zero the tick counter, as if the push button had been pressed.
    pub fn reset_zero(&self) {
        self.button_edge();
    }

    /// Invert the direction applied to subsequent edges. Ticks already
    /// accumulated are not touched.
    pub fn set_reverse(&self, reverse: bool) {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).reverse = reverse;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: Ky040Config = Ky040Config {
        angle_min: 0,
        angle_max: 90,
        debounce_us: 1500,
        reverse: false,
    };

    fn no_debounce() -> Ky040Config {
        Ky040Config { debounce_us: 0, ..CONFIG }
    }

    #[test]
    fn check_range_validation() {
        let bad = Ky040Config { angle_min: 10, angle_max: 9, ..CONFIG };
        assert_eq!(
            EncoderCore::new(&bad, 0).err(),
            Some(Ky040Error::InvalidAngleRange { angle_min: 10, angle_max: 9 })
        );

        //span of 65536 does not fit in 16 bits
        let too_wide = Ky040Config { angle_min: 0, angle_max: 65535, ..CONFIG };
        assert!(EncoderCore::new(&too_wide, 0).is_err());

        //single-value span is the smallest valid one
        let narrow = Ky040Config { angle_min: 42, angle_max: 42, ..CONFIG };
        let encoder = EncoderCore::new(&narrow, 0).unwrap();
        assert_eq!(encoder.angle(), 42);
    }

    #[test]
    fn check_negative_wrap() {
        let encoder = EncoderCore::new(&no_debounce(), 0).unwrap();

        //one counter-clockwise tick from zero lands on the top of the span
        encoder.clock_edge(true, 0);
        assert_eq!(encoder.ticks(), 90);
        assert_eq!(encoder.angle(), 90);

        encoder.clock_edge(true, 0);
        assert_eq!(encoder.angle(), 89);
    }

    #[test]
    fn check_positive_wrap() {
        let encoder = EncoderCore::new(&no_debounce(), 0).unwrap();

        for _ in 0..90 {
            encoder.clock_edge(false, 0);
        }
        assert_eq!(encoder.angle(), 90);

        //one more clockwise tick wraps back to the bottom of the range
        encoder.clock_edge(false, 0);
        assert_eq!(encoder.angle(), 0);
    }

    #[test]
    fn check_angle_offset_range() {
        let config = Ky040Config { angle_min: 10, angle_max: 20, debounce_us: 0, reverse: false };
        let encoder = EncoderCore::new(&config, 0).unwrap();

        assert_eq!(encoder.angle(), 10);
        encoder.clock_edge(true, 0);
        assert_eq!(encoder.angle(), 20);
        for _ in 0..25 {
            encoder.clock_edge(false, 0);
        }
        let angle = encoder.angle();
        assert!((10..=20).contains(&angle), "angle {angle} escaped the range");
    }

    #[test]
    fn check_debounce_window() {
        let encoder = EncoderCore::new(&CONFIG, 0).unwrap();

        //two edges closer than 1500us count as a single tick
        encoder.clock_edge(false, 2_000);
        encoder.clock_edge(false, 2_500);
        assert_eq!(encoder.ticks(), 1);

        //the dropped edge must not refresh the timestamp either
        encoder.clock_edge(false, 3_600);
        assert_eq!(encoder.ticks(), 2);
    }

    #[test]
    fn check_debounce_disabled() {
        let encoder = EncoderCore::new(&no_debounce(), 0).unwrap();

        encoder.clock_edge(false, 0);
        encoder.clock_edge(false, 0);
        encoder.clock_edge(false, 0);
        assert_eq!(encoder.ticks(), 3);
    }

    #[test]
    fn check_reset_zero() {
        let encoder = EncoderCore::new(&no_debounce(), 0).unwrap();

        for _ in 0..37 {
            encoder.clock_edge(false, 0);
        }
        assert_eq!(encoder.ticks(), 37);

        encoder.reset_zero();
        assert_eq!(encoder.ticks(), 0);
        assert_eq!(encoder.angle(), CONFIG.angle_min);
    }

    #[test]
    fn check_set_range_rescale() {
        let encoder = EncoderCore::new(&no_debounce(), 0).unwrap();

        for _ in 0..85 {
            encoder.clock_edge(false, 0);
        }
        assert_eq!(encoder.ticks(), 85);

        //shrinking the span rescales via modulo, not clamping
        encoder.set_range(0, 9).unwrap();
        assert_eq!(encoder.ticks(), 5);
        assert_eq!(encoder.angle(), 5);

        //invalid ranges are rejected and leave the state untouched
        assert!(encoder.set_range(5, 4).is_err());
        assert_eq!(encoder.ticks(), 5);
    }

    #[test]
    fn check_reverse_not_retroactive() {
        let encoder = EncoderCore::new(&no_debounce(), 0).unwrap();

        encoder.clock_edge(false, 0);
        encoder.clock_edge(false, 0);
        assert_eq!(encoder.ticks(), 2);

        //reversal only affects edges from here on
        encoder.set_reverse(true);
        assert_eq!(encoder.ticks(), 2);
        encoder.clock_edge(true, 0);
        assert_eq!(encoder.ticks(), 3);
        encoder.clock_edge(false, 0);
        assert_eq!(encoder.ticks(), 2);
    }
}
