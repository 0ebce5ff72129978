//! ESP32 board for the servoknob appliance: two KY-040 knobs, an LEDC
//! PWM power stage with two direction lines, and an SSD1306 status
//! display on I2C.

use display_interface::DisplayError;
use embedded_graphics::{
    geometry::Point,
    mono_font::{ascii, MonoTextStyleBuilder},
    pixelcolor::BinaryColor,
    text::{Baseline, Text},
    Drawable,
};
use esp_idf_svc::hal::{
    gpio::{AnyIOPin, AnyOutputPin, IOPin, Output, OutputPin, PinDriver},
    i2c::{I2cConfig, I2cDriver},
    ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution},
    prelude::Peripherals,
    units::Hertz,
};
use esp_idf_svc::sys::EspError;
use ky040::esp::Ky040;
use ky040::{Ky040Config, Ky040Error};
use servoloop::hardware::{AngleSource, Motor, StatusDisplay};
use ssd1306::{
    mode::BufferedGraphicsMode,
    prelude::{DisplayConfig, DisplayRotation, DisplaySize128x64, I2CInterface},
    I2CDisplayInterface, Ssd1306,
};

type DisplayType = Ssd1306<
    I2CInterface<I2cDriver<'static>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

type EncoderPins = (AnyIOPin, AnyIOPin, Option<AnyIOPin>);

pub struct Board {
    desired_pins: Option<EncoderPins>,
    current_pins: Option<EncoderPins>,
    motor: Option<BoardMotor>,
    display: Option<BoardDisplay>,
}

impl Board {
    pub fn init() -> Self {
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();

        let peripherals = Peripherals::take().unwrap();
        let pins = peripherals.pins;

        // Power stage: 10-bit duty at 5 kHz, like the bridge expects
        let timer = LedcTimerDriver::new(
            peripherals.ledc.timer0,
            &TimerConfig::new()
                .frequency(Hertz(5_000))
                .resolution(Resolution::Bits10),
        )
        .unwrap();
        let motor = BoardMotor {
            pwm: LedcDriver::new(peripherals.ledc.channel0, &timer, pins.gpio5).unwrap(),
            forward: PinDriver::output(pins.gpio6.downgrade_output()).unwrap(),
            backward: PinDriver::output(pins.gpio7.downgrade_output()).unwrap(),
        };

        let i2c = I2cDriver::new(
            peripherals.i2c0,
            pins.gpio21,
            pins.gpio22,
            &I2cConfig::new().baudrate(Hertz(400_000)),
        )
        .unwrap();
        let interface = I2CDisplayInterface::new(i2c);
        let display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();

        Self {
            // setpoint knob carries the re-zero push button
            desired_pins: Some((
                pins.gpio18.downgrade(),
                pins.gpio19.downgrade(),
                Some(pins.gpio10.downgrade()),
            )),
            current_pins: Some((pins.gpio8.downgrade(), pins.gpio9.downgrade(), None)),
            motor: Some(motor),
            display: Some(BoardDisplay(display)),
        }
    }

    pub fn desired_encoder(&mut self, config: &Ky040Config) -> Result<BoardEncoder, Ky040Error> {
        let (clk, dt, sw) = self.desired_pins.take().expect("setpoint knob already taken");
        Ok(BoardEncoder(Ky040::new(clk, dt, sw, config)?))
    }

    pub fn current_encoder(&mut self, config: &Ky040Config) -> Result<BoardEncoder, Ky040Error> {
        let (clk, dt, sw) = self.current_pins.take().expect("shaft encoder already taken");
        Ok(BoardEncoder(Ky040::new(clk, dt, sw, config)?))
    }

    pub fn motor(&mut self) -> Option<BoardMotor> {
        self.motor.take()
    }

    pub fn display(&mut self) -> Option<BoardDisplay> {
        self.display.take()
    }
}

pub struct BoardEncoder(Ky040<'static>);

impl AngleSource for BoardEncoder {
    fn angle(&self) -> u16 {
        self.0.angle()
    }
}

pub struct BoardMotor {
    pwm: LedcDriver<'static>,
    forward: PinDriver<'static, AnyOutputPin, Output>,
    backward: PinDriver<'static, AnyOutputPin, Output>,
}

impl Motor for BoardMotor {
    type Error = EspError;

    fn set_direction(&mut self, forward: bool) -> Result<(), EspError> {
        if forward {
            self.forward.set_high()?;
            self.backward.set_low()?;
        } else {
            self.forward.set_low()?;
            self.backward.set_high()?;
        }
        Ok(())
    }

    fn set_speed(&mut self, duty: u32) -> Result<(), EspError> {
        self.pwm.set_duty(duty)
    }

    fn stop(&mut self) -> Result<(), EspError> {
        self.forward.set_low()?;
        self.backward.set_low()?;
        self.pwm.set_duty(0)
    }
}

pub struct BoardDisplay(DisplayType);

impl StatusDisplay for BoardDisplay {
    type Error = DisplayError;

    /// The panel size is fixed by the driver type; the requested
    /// dimensions are only checked against it.
    fn init(&mut self, width: u32, height: u32) -> Result<(), DisplayError> {
        if (width, height) != (128, 64) {
            log::warn!("display is 128x64, requested {width}x{height}");
        }
        self.0.init()
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.0.clear_buffer();
        self.0.flush()
    }

    fn draw_text(&mut self, line: u8, text: &str) -> Result<(), DisplayError> {
        let style = MonoTextStyleBuilder::new()
            .font(&ascii::FONT_6X10)
            .text_color(BinaryColor::On)
            .build();
        Text::with_baseline(text, Point::new(0, line as i32 * 12), style, Baseline::Top)
            .draw(&mut self.0)?;
        self.0.flush()
    }
}
