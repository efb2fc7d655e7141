//! # PCF8563 Real-Time Clock Driver
//!
//! A platform-agnostic driver for the NXP PCF8563 real-time clock using the
//! `embedded-hal` I2C traits.
//!
//! The driver keeps a cache of the chip's sixteen registers and a typed view
//! of each register group: [`Control`], [`Interrupt`], [`Alarm`],
//! [`ClockOut`] and [`Timer`]. Mutate a group through its `*_mut()` accessor
//! and flush it with the matching `write_*()` call, or refresh it from the
//! chip with `read_*()`. The higher level operations (alarm, timer,
//! interrupt handling, wall-clock time) are built from those pairs.
//!
//! ## Features
//!
//! - Wall-clock read/write through chrono's `NaiveDateTime` (1900-2099)
//! - Alarm on any combination of minute, hour, day and weekday
//! - Countdown timer solved from a duration in seconds
//! - Interrupt enable, flag retrieval and acknowledge
//! - CLKOUT square wave control
//! - Optional async support via the `async` feature
//! - Optional logging via the `log` or `defmt` feature
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pcf8563::Pcf8563;
//!
//! let mut rtc = Pcf8563::new_with_i2c(i2c);
//! rtc.begin()?;
//! rtc.set_datetime(&datetime)?;
//!
//! // fire every day at 07:30
//! rtc.set_alarm(Some(30), Some(7), None, None)?;
//! rtc.enable_alarm_interrupt(true, false)?;
//!
//! let fired = rtc.get_interrupt()?;
//! if fired.alarm() {
//!     // ...
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every bus access returns [`Pcf8563Error`]. Nothing is retried: a failed
//! transfer leaves the register cache and all typed fields unchanged and the
//! caller decides what to do next. Writes are staged in a copy of the cache
//! and only committed once the chip acknowledged them. The one exception is
//! a group edited through its `*_mut()` accessor, which keeps the caller's
//! edit when the following `write_*()` fails.
#![no_std]

#[macro_use]
mod fmt;

mod datetime;
mod fields;
mod registers;
pub mod sync;
mod timer;

#[cfg(feature = "async")]
pub mod asynch;

use chrono::NaiveDateTime;
use embedded_hal::i2c::I2c;

pub use datetime::{bcd_to_int, int_to_bcd, Pcf8563DateTimeError, BASE_YEAR};
pub use fields::{
    Alarm, AlarmField, ClockOut, Control, Interrupt, InterruptFlags, RegisterGroup, Timer,
};
pub use registers::*;
pub use timer::{MAX_DURATION, MIN_DURATION};

pub(crate) use datetime::Pcf8563DateTime;

/// Fixed I2C address of the PCF8563 (0xA2 write, 0xA3 read).
pub const DEFAULT_ADDRESS: u8 = 0x51;

/// Number of registers holding the wall-clock time (0x02-0x08).
pub(crate) const DATETIME_LENGTH: usize = 7;

/// Error type for PCF8563 operations.
#[derive(Debug)]
pub enum Pcf8563Error<I2CE> {
    /// I2C bus error: no acknowledge, incomplete transfer or arbitration loss
    I2c(I2CE),
    /// The chip reports that clock integrity is not guaranteed (VL flag)
    InvalidTime,
    /// `DateTime` conversion error
    DateTime(Pcf8563DateTimeError),
}

impl<I2CE> From<I2CE> for Pcf8563Error<I2CE> {
    fn from(e: I2CE) -> Self {
        Pcf8563Error::I2c(e)
    }
}

#[cfg(feature = "defmt")]
impl<I2CE> defmt::Format for Pcf8563Error<I2CE> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Pcf8563Error::I2c(_) => defmt::write!(f, "I2c"),
            Pcf8563Error::InvalidTime => defmt::write!(f, "InvalidTime"),
            Pcf8563Error::DateTime(e) => defmt::write!(f, "DateTime({})", e),
        }
    }
}

/// PCF8563 Real-Time Clock driver.
pub struct Pcf8563<I2C: I2c> {
    i2c: I2C,
    address: u8,
    registers: RegisterCache,
    control: Control,
    interrupt: Interrupt,
    alarm: Alarm,
    clock_out: ClockOut,
    timer: Timer,
}

// Generates the cached group accessors and the read/write pair for each
// register group.
macro_rules! register_group_access {
    ($(($name:ident, $typ:ty)),+) => {
        $(
            paste::paste! {
                #[doc = concat!(
                    "Cached ", stringify!($name), " settings, as last read or written."
                )]
                pub fn $name(&self) -> &$typ {
                    &self.$name
                }

                #[doc = concat!(
                    "Mutable cached ", stringify!($name),
                    " settings; flush with `write_", stringify!($name), "()`."
                )]
                pub fn [<$name _mut>](&mut self) -> &mut $typ {
                    &mut self.$name
                }

                #[doc = concat!(
                    "Reads the ", stringify!($name),
                    " registers from the chip into the cached settings."
                )]
                ///
                /// # Errors
                /// Returns an error if the I2C transfer fails; the cached settings are
                /// then unchanged.
                pub fn [<read_ $name>](&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
                    self.read_registers(<$typ>::START, <$typ>::LENGTH)?;
                    self.$name = <$typ>::decode(&self.registers);
                    Ok(())
                }

                #[doc = concat!(
                    "Encodes the cached ", stringify!($name),
                    " settings and writes them to the chip."
                )]
                ///
                /// # Errors
                /// Returns an error if the I2C transfer fails; the register cache is
                /// then unchanged.
                pub fn [<write_ $name>](&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
                    let group = self.$name;
                    self.write_group(&group)
                }
            }
        )+
    };
}

impl<I2C: I2c> Pcf8563<I2C> {
    /// Creates a new PCF8563 driver instance.
    ///
    /// Nothing is sent on the bus; call [`Pcf8563::begin`] to initialize the chip.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus implementation
    /// * `address` - The I2C address of the device (normally [`DEFAULT_ADDRESS`])
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            registers: RegisterCache::new(),
            control: Control::default(),
            interrupt: Interrupt::default(),
            alarm: Alarm::default(),
            clock_out: ClockOut::default(),
            timer: Timer::default(),
        }
    }

    /// Creates a driver at [`DEFAULT_ADDRESS`].
    pub fn new_with_i2c(i2c: I2C) -> Self {
        Self::new(i2c, DEFAULT_ADDRESS)
    }

    /// Releases the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Returns the register cache.
    pub fn registers(&self) -> &RegisterCache {
        &self.registers
    }

    /// Puts every register group into a known state.
    ///
    /// Control: clock running, test mode off, power-on reset override on.
    /// CLKOUT off at 32.768 kHz, alarm and timer disabled, interrupts
    /// disabled with both flags cleared. A failure means the chip is absent
    /// or unreachable.
    ///
    /// # Errors
    /// Returns the first I2C error; later groups are then not written.
    pub fn begin(&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
        let control = Control {
            external_clock_test_mode: false,
            source_clock_stopped: false,
            power_on_reset_override: true,
        };
        self.write_group(&control)?;
        self.control = control;

        self.write_group(&ClockOut::default())?;
        self.clock_out = ClockOut::default();

        self.write_group(&Alarm::default())?;
        self.alarm = Alarm::default();

        self.write_group(&Timer::default())?;
        self.timer = Timer::default();

        self.write_group(&Interrupt::default())?;
        self.interrupt = Interrupt::default();

        info!("PCF8563: initialized at address {}", self.address);
        Ok(())
    }

    /// Reads `length` registers starting at `start` into the cache.
    ///
    /// The bytes land in a scratch buffer first so a failed transfer leaves
    /// the cache as it was.
    fn read_registers(
        &mut self,
        start: RegAddr,
        length: usize,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let mut data = [0u8; REGISTER_COUNT];
        let data = &mut data[..length];
        if let Err(e) = self.i2c.write_read(self.address, &[start as u8], data) {
            error!("PCF8563: reading {} registers from {:?} failed", length, start);
            return Err(Pcf8563Error::I2c(e));
        }
        self.registers.load(start, data);
        Ok(())
    }

    /// Writes `length` registers of `staged` starting at `start` in one
    /// transfer, then copies them into the cache.
    ///
    /// The cache is only updated once the chip has acknowledged the write.
    fn write_registers(
        &mut self,
        staged: &RegisterCache,
        start: RegAddr,
        length: usize,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let mut frame = [0u8; REGISTER_COUNT + 1];
        frame[0] = start as u8;
        frame[1..=length].copy_from_slice(staged.span(start, length));
        if let Err(e) = self.i2c.write(self.address, &frame[..=length]) {
            error!("PCF8563: writing {} registers at {:?} failed", length, start);
            return Err(Pcf8563Error::I2c(e));
        }
        self.registers.load(start, staged.span(start, length));
        Ok(())
    }

    /// Encodes `group` into a copy of the cache and writes its span.
    fn write_group<G: RegisterGroup>(&mut self, group: &G) -> Result<(), Pcf8563Error<I2C::Error>> {
        let mut staged = self.registers;
        group.encode(&mut staged);
        debug!(
            "PCF8563: writing {:?} at {:?}",
            staged.span(G::START, G::LENGTH),
            G::START
        );
        self.write_registers(&staged, G::START, G::LENGTH)
    }

    /// Gets the current date and time from the device.
    ///
    /// # Errors
    /// * `Pcf8563Error::I2c` if the transfer fails
    /// * `Pcf8563Error::InvalidTime` if the chip flagged the time as unreliable
    /// * `Pcf8563Error::DateTime` if the registers hold no valid calendar date
    pub fn datetime(&mut self) -> Result<NaiveDateTime, Pcf8563Error<I2C::Error>> {
        self.read_registers(RegAddr::VlSeconds, DATETIME_LENGTH)?;
        let raw = self.raw_datetime();
        if raw.voltage_low() {
            error!("PCF8563: clock integrity lost, time is invalid");
            return Err(Pcf8563Error::InvalidTime);
        }
        raw.into_datetime().map_err(Pcf8563Error::DateTime)
    }

    /// Sets the current date and time on the device. This also clears the
    /// clock integrity flag.
    ///
    /// # Errors
    /// * `Pcf8563Error::DateTime` if the year is outside 1900-2099
    /// * `Pcf8563Error::I2c` if the transfer fails
    pub fn set_datetime(
        &mut self,
        datetime: &NaiveDateTime,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let raw = Pcf8563DateTime::from_datetime(datetime).map_err(Pcf8563Error::DateTime)?;
        let data: [u8; DATETIME_LENGTH] = (&raw).into();
        let mut staged = self.registers;
        staged.load(RegAddr::VlSeconds, &data);
        self.write_registers(&staged, RegAddr::VlSeconds, DATETIME_LENGTH)
    }

    fn raw_datetime(&self) -> Pcf8563DateTime {
        let mut data = [0u8; DATETIME_LENGTH];
        data.copy_from_slice(self.registers.span(RegAddr::VlSeconds, DATETIME_LENGTH));
        Pcf8563DateTime::from(data)
    }

    /// Configures the alarm. Each component is enabled when given and in
    /// range (minute 0-59, hour 0-23, day 1-31, weekday 0-6) and disabled
    /// otherwise. The whole alarm group is written once.
    ///
    /// # Errors
    /// Returns an error if the I2C transfer fails.
    pub fn set_alarm(
        &mut self,
        minute: Option<u8>,
        hour: Option<u8>,
        day: Option<u8>,
        weekday: Option<u8>,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let alarm = self.alarm.with_components(minute, hour, day, weekday);
        self.write_group(&alarm)?;
        self.alarm = alarm;
        Ok(())
    }

    /// Disables all four alarm components.
    ///
    /// # Errors
    /// Returns an error if the I2C transfer fails.
    pub fn disable_alarm(&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.set_alarm(None, None, None, None)
    }

    /// Enables or disables the alarm interrupt.
    ///
    /// The interrupt register is read first so a timer flag raised by the
    /// chip is written back unchanged. `keep_flag == false` clears a latched
    /// alarm flag.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub fn enable_alarm_interrupt(
        &mut self,
        enable: bool,
        keep_flag: bool,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.read_interrupt()?;
        let mut interrupt = self.interrupt;
        interrupt.alarm_flag_active = keep_flag;
        interrupt.alarm_interrupt_enable = enable;
        self.write_group(&interrupt)?;
        self.interrupt = interrupt;
        Ok(())
    }

    /// Disables the alarm interrupt and clears the alarm flag.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub fn disable_alarm_interrupt(&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.enable_alarm_interrupt(false, false)
    }

    /// Starts the countdown timer as close to `seconds` as the chip allows.
    ///
    /// Returns `Ok(Some(realized))` with the duration actually programmed,
    /// or `Ok(None)` when `seconds` is outside [`MIN_DURATION`]..=[`MAX_DURATION`],
    /// in which case nothing is written.
    ///
    /// # Errors
    /// Returns an error if the I2C transfer fails.
    pub fn set_timer(&mut self, seconds: f64) -> Result<Option<f64>, Pcf8563Error<I2C::Error>> {
        let Some(timer) = Timer::for_duration(seconds) else {
            debug!("PCF8563: timer duration {} out of range", seconds);
            return Ok(None);
        };
        self.write_group(&timer)?;
        self.timer = timer;
        Ok(Some(timer.duration()))
    }

    /// Starts or stops the timer, keeping the source clock currently
    /// programmed in the chip. Only the timer control register is touched.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub fn enable_timer(&mut self, enable: bool) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.read_registers(RegAddr::TimerControl, 1)?;
        let mut control: TimerControl = self.registers.get(RegAddr::TimerControl);
        control.set_enabled(enable);
        let mut staged = self.registers;
        staged.set(RegAddr::TimerControl, control);
        self.write_registers(&staged, RegAddr::TimerControl, 1)?;
        self.timer.source = control.source();
        self.timer.enabled = enable;
        Ok(())
    }

    /// Stops the timer.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub fn disable_timer(&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.enable_timer(false)
    }

    /// Enables or disables the timer interrupt.
    ///
    /// With `pulse_mode` the INT pin pulses on expiry instead of following
    /// the timer flag. `keep_flag == false` clears a latched timer flag; the
    /// alarm flag is written back as read.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub fn enable_timer_interrupt(
        &mut self,
        enable: bool,
        pulse_mode: bool,
        keep_flag: bool,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.read_interrupt()?;
        let mut interrupt = self.interrupt;
        interrupt.timer_pulse_mode = pulse_mode;
        interrupt.timer_flag_active = keep_flag;
        interrupt.timer_interrupt_enable = enable;
        self.write_group(&interrupt)?;
        self.interrupt = interrupt;
        Ok(())
    }

    /// Disables the timer interrupt and clears the timer flag.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub fn disable_timer_interrupt(&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.enable_timer_interrupt(false, false, false)
    }

    /// Returns the latched alarm and timer flags and clears them on the chip.
    ///
    /// The interrupt register is only written back when a flag was set.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub fn get_interrupt(&mut self) -> Result<InterruptFlags, Pcf8563Error<I2C::Error>> {
        self.read_interrupt()?;
        let mut flags = InterruptFlags::default();
        flags.set_alarm(self.interrupt.alarm_flag_active);
        flags.set_timer(self.interrupt.timer_flag_active);
        if !flags.is_empty() {
            let mut cleared = self.interrupt;
            cleared.alarm_flag_active = false;
            cleared.timer_flag_active = false;
            self.write_group(&cleared)?;
            self.interrupt = cleared;
        }
        Ok(flags)
    }

    /// Drives a 1 Hz square wave on CLKOUT for oscillator trimming, or turns
    /// the output off.
    ///
    /// # Errors
    /// Returns an error if the I2C transfer fails.
    pub fn clock_out_for_trimmer(
        &mut self,
        enable: bool,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let mut clock_out = self.clock_out;
        if enable {
            clock_out.frequency = ClockOutFrequency::Hz1;
        }
        clock_out.active = enable;
        self.write_group(&clock_out)?;
        self.clock_out = clock_out;
        Ok(())
    }

    register_group_access!(
        (control, Control),
        (interrupt, Interrupt),
        (alarm, Alarm),
        (clock_out, ClockOut),
        (timer, Timer)
    );
}
