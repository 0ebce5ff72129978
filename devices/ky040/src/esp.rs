//! GPIO/interrupt wiring for the decoder on ESP32 targets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use esp_idf_svc::hal::gpio::{AnyIOPin, Input, InterruptType, PinDriver, Pull};
use esp_idf_svc::sys::{self, EspError};

use crate::{EncoderCore, Ky040Config, Ky040Error};

static ISR_SERVICE_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the process-wide GPIO interrupt dispatch service.
///
/// The service can only be installed once per process; a second call
/// (from the other encoder instance, or from unrelated code having
/// installed it already) succeeds as a no-op.
pub fn install_isr_service_once(intr_flags: i32) -> Result<(), EspError> {
    if ISR_SERVICE_INSTALLED.load(Ordering::Acquire) {
        return Ok(());
    }
    let err = unsafe { sys::gpio_install_isr_service(intr_flags) };
    if err == sys::ESP_ERR_INVALID_STATE as i32 {
        ISR_SERVICE_INSTALLED.store(true, Ordering::Release);
        return Ok(());
    }
    sys::esp!(err)?;
    ISR_SERVICE_INSTALLED.store(true, Ordering::Release);
    Ok(())
}

/// One KY-040 encoder wired to its GPIO pins.
///
/// The rotation clock fires on rising edges, the optional push button on
/// falling edges (re-zero gesture); both handlers run in interrupt
/// context and only touch the shared [`EncoderCore`]. Dropping the
/// driver detaches the handlers; do not drop it while an interrupt for
/// this instance may still be in flight.
pub struct Ky040<'d> {
    core: Arc<EncoderCore>,
    _clk: PinDriver<'d, AnyIOPin, Input>,
    _dt: PinDriver<'d, AnyIOPin, Input>,
    _sw: Option<PinDriver<'d, AnyIOPin, Input>>,
}

impl<'d> Ky040<'d> {
    pub fn new(
        clk: AnyIOPin,
        dt: AnyIOPin,
        sw: Option<AnyIOPin>,
        config: &Ky040Config,
    ) -> Result<Self, Ky040Error> {
        install_isr_service_once(0).map_err(hardware_error)?;

        let now_us = unsafe { sys::esp_timer_get_time() };
        let core = Arc::new(EncoderCore::new(config, now_us)?);

        let mut dt = PinDriver::input(dt).map_err(hardware_error)?;
        dt.set_pull(Pull::Up).map_err(hardware_error)?;
        let dt_pin = dt.pin();

        let mut clk = PinDriver::input(clk).map_err(hardware_error)?;
        clk.set_pull(Pull::Up).map_err(hardware_error)?;
        clk.set_interrupt_type(InterruptType::PosEdge)
            .map_err(hardware_error)?;
        {
            let core = core.clone();
            // The callback runs in interrupt context: no allocation, no
            // blocking, raw register reads only.
            unsafe {
                clk.subscribe(move || {
                    let now_us = sys::esp_timer_get_time();
                    let partner_high = sys::gpio_get_level(dt_pin) != 0;
                    core.clock_edge(partner_high, now_us);
                })
                .map_err(hardware_error)?;
            }
        }
        clk.enable_interrupt().map_err(hardware_error)?;

        let sw = match sw {
            Some(pin) => {
                let mut sw = PinDriver::input(pin).map_err(hardware_error)?;
                sw.set_pull(Pull::Up).map_err(hardware_error)?;
                sw.set_interrupt_type(InterruptType::NegEdge)
                    .map_err(hardware_error)?;
                {
                    let core = core.clone();
                    unsafe {
                        sw.subscribe(move || core.button_edge())
                            .map_err(hardware_error)?;
                    }
                }
                sw.enable_interrupt().map_err(hardware_error)?;
                Some(sw)
            }
            None => None,
        };

        log::debug!(
            "ky040 ready: clk {} dt {} sw {:?}",
            clk.pin(),
            dt_pin,
            sw.as_ref().map(|pin| pin.pin())
        );
        Ok(Self { core, _clk: clk, _dt: dt, _sw: sw })
    }

    pub fn angle(&self) -> u16 {
        self.core.angle()
    }

    pub fn ticks(&self) -> i32 {
        self.core.ticks()
    }

    pub fn set_range(&self, angle_min: u16, angle_max: u16) -> Result<(), Ky040Error> {
        self.core.set_range(angle_min, angle_max)
    }

    pub fn reset_zero(&self) {
        self.core.reset_zero();
    }

    pub fn set_reverse(&self, reverse: bool) {
        self.core.set_reverse(reverse);
    }
}

fn hardware_error(err: EspError) -> Ky040Error {
    Ky040Error::Hardware(err.code())
}
