//! Async implementation of the PCF8563 driver.
//!
//! This module provides an async interface to the PCF8563 RTC device using
//! `embedded-hal-async` traits. It is only available when the `async` feature
//! is enabled. Register groups, encodings and error types are shared with
//! the blocking driver.
//!
//! # Example
//!
//! ```rust,ignore
//! use pcf8563::asynch::Pcf8563;
//!
//! let mut rtc = Pcf8563::new_with_i2c(i2c);
//! rtc.begin().await?;
//! let datetime = rtc.datetime().await?;
//! ```

use chrono::NaiveDateTime;
use embedded_hal_async::i2c::I2c;
use paste::paste;

use crate::{
    Alarm, ClockOut, ClockOutFrequency, Control, Interrupt, InterruptFlags, Pcf8563DateTime,
    Pcf8563Error, RegAddr, RegisterCache, RegisterGroup, Timer, TimerControl, DATETIME_LENGTH,
    DEFAULT_ADDRESS, REGISTER_COUNT,
};

/// PCF8563 Real-Time Clock async driver.
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

impl<I2C: I2c> Pcf8563<I2C> {
    /// Creates a new PCF8563 async driver instance.
    ///
    /// # Arguments
    /// * `i2c` - The async I2C bus implementation
    /// * `address` - The I2C address of the device (normally 0x51)
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

    /// Creates a driver at the fixed PCF8563 address.
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

    /// Puts every register group into a known state, see
    /// [`crate::Pcf8563::begin`].
    ///
    /// # Errors
    /// Returns the first I2C error.
    pub async fn begin(&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
        let control = Control {
            external_clock_test_mode: false,
            source_clock_stopped: false,
            power_on_reset_override: true,
        };
        self.write_group(&control).await?;
        self.control = control;
        self.write_group(&ClockOut::default()).await?;
        self.clock_out = ClockOut::default();
        self.write_group(&Alarm::default()).await?;
        self.alarm = Alarm::default();
        self.write_group(&Timer::default()).await?;
        self.timer = Timer::default();
        self.write_group(&Interrupt::default()).await?;
        self.interrupt = Interrupt::default();
        info!("PCF8563: initialized at address {}", self.address);
        Ok(())
    }

    async fn read_registers(
        &mut self,
        start: RegAddr,
        length: usize,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let mut data = [0u8; REGISTER_COUNT];
        let data = &mut data[..length];
        if let Err(e) = self.i2c.write_read(self.address, &[start as u8], data).await {
            error!("PCF8563: reading {} registers from {:?} failed", length, start);
            return Err(Pcf8563Error::I2c(e));
        }
        self.registers.load(start, data);
        Ok(())
    }

    async fn write_registers(
        &mut self,
        staged: &RegisterCache,
        start: RegAddr,
        length: usize,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let mut frame = [0u8; REGISTER_COUNT + 1];
        frame[0] = start as u8;
        frame[1..=length].copy_from_slice(staged.span(start, length));
        if let Err(e) = self.i2c.write(self.address, &frame[..=length]).await {
            error!("PCF8563: writing {} registers at {:?} failed", length, start);
            return Err(Pcf8563Error::I2c(e));
        }
        self.registers.load(start, staged.span(start, length));
        Ok(())
    }

    async fn write_group<G: RegisterGroup>(
        &mut self,
        group: &G,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let mut staged = self.registers;
        group.encode(&mut staged);
        debug!(
            "PCF8563: writing {:?} at {:?}",
            staged.span(G::START, G::LENGTH),
            G::START
        );
        self.write_registers(&staged, G::START, G::LENGTH).await
    }

    /// Gets the current date and time from the device.
    ///
    /// # Errors
    /// Same as [`crate::Pcf8563::datetime`].
    pub async fn datetime(&mut self) -> Result<NaiveDateTime, Pcf8563Error<I2C::Error>> {
        self.read_registers(RegAddr::VlSeconds, DATETIME_LENGTH).await?;
        let mut data = [0u8; DATETIME_LENGTH];
        data.copy_from_slice(self.registers.span(RegAddr::VlSeconds, DATETIME_LENGTH));
        let raw = Pcf8563DateTime::from(data);
        if raw.voltage_low() {
            error!("PCF8563: clock integrity lost, time is invalid");
            return Err(Pcf8563Error::InvalidTime);
        }
        raw.into_datetime().map_err(Pcf8563Error::DateTime)
    }

    /// Sets the current date and time on the device.
    ///
    /// # Errors
    /// Same as [`crate::Pcf8563::set_datetime`].
    pub async fn set_datetime(
        &mut self,
        datetime: &NaiveDateTime,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let raw = Pcf8563DateTime::from_datetime(datetime).map_err(Pcf8563Error::DateTime)?;
        let data: [u8; DATETIME_LENGTH] = (&raw).into();
        let mut staged = self.registers;
        staged.load(RegAddr::VlSeconds, &data);
        self.write_registers(&staged, RegAddr::VlSeconds, DATETIME_LENGTH).await
    }

    /// Configures the alarm, see [`crate::Pcf8563::set_alarm`].
    ///
    /// # Errors
    /// Returns an error if the I2C transfer fails.
    pub async fn set_alarm(
        &mut self,
        minute: Option<u8>,
        hour: Option<u8>,
        day: Option<u8>,
        weekday: Option<u8>,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let alarm = self.alarm.with_components(minute, hour, day, weekday);
        self.write_group(&alarm).await?;
        self.alarm = alarm;
        Ok(())
    }

    /// Disables all four alarm components.
    ///
    /// # Errors
    /// Returns an error if the I2C transfer fails.
    pub async fn disable_alarm(&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.set_alarm(None, None, None, None).await
    }

    /// Enables or disables the alarm interrupt after reading the current
    /// interrupt state.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub async fn enable_alarm_interrupt(
        &mut self,
        enable: bool,
        keep_flag: bool,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.read_interrupt().await?;
        let mut interrupt = self.interrupt;
        interrupt.alarm_flag_active = keep_flag;
        interrupt.alarm_interrupt_enable = enable;
        self.write_group(&interrupt).await?;
        self.interrupt = interrupt;
        Ok(())
    }

    /// Disables the alarm interrupt and clears the alarm flag.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub async fn disable_alarm_interrupt(&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.enable_alarm_interrupt(false, false).await
    }

    /// Starts the countdown timer, see [`crate::Pcf8563::set_timer`].
    ///
    /// # Errors
    /// Returns an error if the I2C transfer fails.
    pub async fn set_timer(
        &mut self,
        seconds: f64,
    ) -> Result<Option<f64>, Pcf8563Error<I2C::Error>> {
        let Some(timer) = Timer::for_duration(seconds) else {
            return Ok(None);
        };
        self.write_group(&timer).await?;
        self.timer = timer;
        Ok(Some(timer.duration()))
    }

    /// Starts or stops the timer keeping the programmed source clock.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub async fn enable_timer(&mut self, enable: bool) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.read_registers(RegAddr::TimerControl, 1).await?;
        let mut control: TimerControl = self.registers.get(RegAddr::TimerControl);
        control.set_enabled(enable);
        let mut staged = self.registers;
        staged.set(RegAddr::TimerControl, control);
        self.write_registers(&staged, RegAddr::TimerControl, 1).await?;
        self.timer.source = control.source();
        self.timer.enabled = enable;
        Ok(())
    }

    /// Stops the timer.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub async fn disable_timer(&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.enable_timer(false).await
    }

    /// Enables or disables the timer interrupt after reading the current
    /// interrupt state.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub async fn enable_timer_interrupt(
        &mut self,
        enable: bool,
        pulse_mode: bool,
        keep_flag: bool,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.read_interrupt().await?;
        let mut interrupt = self.interrupt;
        interrupt.timer_pulse_mode = pulse_mode;
        interrupt.timer_flag_active = keep_flag;
        interrupt.timer_interrupt_enable = enable;
        self.write_group(&interrupt).await?;
        self.interrupt = interrupt;
        Ok(())
    }

    /// Disables the timer interrupt and clears the timer flag.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub async fn disable_timer_interrupt(&mut self) -> Result<(), Pcf8563Error<I2C::Error>> {
        self.enable_timer_interrupt(false, false, false).await
    }

    /// Returns the latched alarm and timer flags and clears them on the chip.
    ///
    /// # Errors
    /// Returns an error if either I2C transfer fails.
    pub async fn get_interrupt(&mut self) -> Result<InterruptFlags, Pcf8563Error<I2C::Error>> {
        self.read_interrupt().await?;
        let mut flags = InterruptFlags::default();
        flags.set_alarm(self.interrupt.alarm_flag_active);
        flags.set_timer(self.interrupt.timer_flag_active);
        if !flags.is_empty() {
            let mut cleared = self.interrupt;
            cleared.alarm_flag_active = false;
            cleared.timer_flag_active = false;
            self.write_group(&cleared).await?;
            self.interrupt = cleared;
        }
        Ok(flags)
    }

    /// Drives 1 Hz on CLKOUT, or turns the output off.
    ///
    /// # Errors
    /// Returns an error if the I2C transfer fails.
    pub async fn clock_out_for_trimmer(
        &mut self,
        enable: bool,
    ) -> Result<(), Pcf8563Error<I2C::Error>> {
        let mut clock_out = self.clock_out;
        if enable {
            clock_out.frequency = ClockOutFrequency::Hz1;
        }
        clock_out.active = enable;
        self.write_group(&clock_out).await?;
        self.clock_out = clock_out;
        Ok(())
    }
}

// Register group access implementations
macro_rules! impl_group_access {
    ($(($name:ident, $typ:ty)),+) => {
        impl<I2C: I2c> Pcf8563<I2C> {
            $(
                paste! {
                    #[doc = concat!("Cached ", stringify!($name), " settings.")]
                    pub fn $name(&self) -> &$typ {
                        &self.$name
                    }

                    #[doc = concat!("Mutable cached ", stringify!($name), " settings.")]
                    pub fn [<$name _mut>](&mut self) -> &mut $typ {
                        &mut self.$name
                    }

                    #[doc = concat!(
                        "Reads the ", stringify!($name), " registers into the cached settings."
                    )]
                    #[doc = "\n\n# Errors"]
                    #[doc = "Returns an error if the I2C transfer fails."]
                    pub async fn [<read_ $name>](
                        &mut self,
                    ) -> Result<(), Pcf8563Error<I2C::Error>> {
                        self.read_registers(<$typ>::START, <$typ>::LENGTH).await?;
                        self.$name = <$typ>::decode(&self.registers);
                        Ok(())
                    }

                    #[doc = concat!(
                        "Writes the cached ", stringify!($name), " settings to the chip."
                    )]
                    #[doc = "\n\n# Errors"]
                    #[doc = "Returns an error if the I2C transfer fails; the register cache is"]
                    #[doc = "then unchanged."]
                    pub async fn [<write_ $name>](
                        &mut self,
                    ) -> Result<(), Pcf8563Error<I2C::Error>> {
                        let group = self.$name;
                        self.write_group(&group).await
                    }
                }
            )+
        }
    }
}

impl_group_access!(
    (control, Control),
    (interrupt, Interrupt),
    (alarm, Alarm),
    (clock_out, ClockOut),
    (timer, Timer)
);
