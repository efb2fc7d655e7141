//! Register definitions and bitfield structures for the PCF8563 RTC.
//!
//! This module contains the register address map, one bitfield type per
//! hardware register, the frequency selectors and the register cache that
//! mirrors the chip's sixteen byte address space.

use bitfield::bitfield;

/// Number of registers in the PCF8563 address space.
pub const REGISTER_COUNT: usize = 0x10;

/// Register addresses for the PCF8563 RTC.
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Control/status 1 (TEST1, STOP, TESTC)
    ControlStatus1 = 0x00,
    /// Control/status 2 (TI_TP, AF, TF, AIE, TIE)
    ControlStatus2 = 0x01,
    /// Seconds register with VL flag (0-59)
    VlSeconds = 0x02,
    /// Minutes register (0-59)
    Minutes = 0x03,
    /// Hours register (0-23)
    Hours = 0x04,
    /// Day of month register (1-31)
    Days = 0x05,
    /// Weekday register (0-6)
    Weekdays = 0x06,
    /// Month register (1-12) with century flag
    CenturyMonths = 0x07,
    /// Year register (0-99)
    Years = 0x08,
    /// Minute alarm register
    MinuteAlarm = 0x09,
    /// Hour alarm register
    HourAlarm = 0x0A,
    /// Day alarm register
    DayAlarm = 0x0B,
    /// Weekday alarm register
    WeekdayAlarm = 0x0C,
    /// CLKOUT control register
    ClockOutControl = 0x0D,
    /// Timer control register
    TimerControl = 0x0E,
    /// Timer countdown value
    Timer = 0x0F,
}

/// Frequency driven on the CLKOUT pin.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockOutFrequency {
    /// 32.768 kHz
    #[default]
    Hz32768 = 0b00,
    /// 1.024 kHz
    Hz1024 = 0b01,
    /// 32 Hz
    Hz32 = 0b10,
    /// 1 Hz
    Hz1 = 0b11,
}
impl From<u8> for ClockOutFrequency {
    /// Creates a `ClockOutFrequency` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0b00, 0b01, 0b10, or 0b11.
    fn from(v: u8) -> Self {
        match v {
            0b00 => ClockOutFrequency::Hz32768,
            0b01 => ClockOutFrequency::Hz1024,
            0b10 => ClockOutFrequency::Hz32,
            0b11 => ClockOutFrequency::Hz1,
            _ => panic!("Invalid value for ClockOutFrequency: {}", v),
        }
    }
}
impl From<ClockOutFrequency> for u8 {
    fn from(v: ClockOutFrequency) -> Self {
        v as u8
    }
}

/// Source clock of the countdown timer.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerSource {
    /// 4.096 kHz
    #[default]
    Hz4096 = 0b00,
    /// 64 Hz
    Hz64 = 0b01,
    /// 1 Hz
    Hz1 = 0b10,
    /// 1/60 Hz
    OneSixtiethHz = 0b11,
}
impl From<u8> for TimerSource {
    /// Creates a `TimerSource` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0b00, 0b01, 0b10, or 0b11.
    fn from(v: u8) -> Self {
        match v {
            0b00 => TimerSource::Hz4096,
            0b01 => TimerSource::Hz64,
            0b10 => TimerSource::Hz1,
            0b11 => TimerSource::OneSixtiethHz,
            _ => panic!("Invalid value for TimerSource: {}", v),
        }
    }
}
impl From<TimerSource> for u8 {
    fn from(v: TimerSource) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Control/status 1 register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct ControlStatus1(u8);
    impl Debug;
    /// EXT_CLK test mode (TEST1)
    pub test1, set_test1: 7;
    /// RTC source clock stopped (STOP)
    pub stop, set_stop: 5;
    /// Power-on reset override (TESTC)
    pub testc, set_testc: 3;
}
from_register_u8!(ControlStatus1);

bitfield! {
    /// Control/status 2 register, interrupt enables and flags.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct ControlStatus2(u8);
    impl Debug;
    /// Timer interrupt pulses instead of following TF (TI_TP)
    pub ti_tp, set_ti_tp: 4;
    /// Alarm flag (AF)
    pub af, set_af: 3;
    /// Timer flag (TF)
    pub tf, set_tf: 2;
    /// Alarm interrupt enable (AIE)
    pub aie, set_aie: 1;
    /// Timer interrupt enable (TIE)
    pub tie, set_tie: 0;
}
from_register_u8!(ControlStatus2);

#[cfg(feature = "defmt")]
impl defmt::Format for ControlStatus2 {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "ControlStatus2(TI_TP={} AF={} TF={} AIE={} TIE={})",
            self.ti_tp(),
            self.af(),
            self.tf(),
            self.aie(),
            self.tie()
        );
    }
}

bitfield! {
    /// Seconds register (0-59) with the clock integrity flag.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct VlSeconds(u8);
    impl Debug;
    /// Clock integrity is not guaranteed (VL)
    pub voltage_low, set_voltage_low: 7;
    /// Tens place of seconds (0-5)
    pub ten_seconds, set_ten_seconds: 6, 4;
    /// Ones place of seconds (0-9)
    pub seconds, set_seconds: 3, 0;
}
from_register_u8!(VlSeconds);

bitfield! {
    /// Minutes register (0-59) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Minutes(u8);
    impl Debug;
    /// Tens place of minutes (0-5)
    pub ten_minutes, set_ten_minutes: 6, 4;
    /// Ones place of minutes (0-9)
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(Minutes);

bitfield! {
    /// Hours register (0-23) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// Tens place of hours (0-2)
    pub ten_hours, set_ten_hours: 5, 4;
    /// Ones place of hours (0-9)
    pub hours, set_hours: 3, 0;
}
from_register_u8!(Hours);

bitfield! {
    /// Day of month register (1-31) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Days(u8);
    impl Debug;
    /// Tens place of day (0-3)
    pub ten_days, set_ten_days: 5, 4;
    /// Ones place of day (0-9)
    pub days, set_days: 3, 0;
}
from_register_u8!(Days);

bitfield! {
    /// Weekday register (0-6, 0 = Sunday).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Weekdays(u8);
    impl Debug;
    /// Day of week (0-6)
    pub weekday, set_weekday: 2, 0;
}
from_register_u8!(Weekdays);

bitfield! {
    /// Month register (1-12) with century flag and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct CenturyMonths(u8);
    impl Debug;
    /// Century flag, adds 100 to the two digit year
    pub century, set_century: 7;
    /// Tens place of month (0-1)
    pub ten_months, set_ten_months: 4, 4;
    /// Ones place of month (0-9)
    pub months, set_months: 3, 0;
}
from_register_u8!(CenturyMonths);

bitfield! {
    /// Year register (0-99) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Years(u8);
    impl Debug;
    /// Tens place of year (0-9)
    pub ten_years, set_ten_years: 7, 4;
    /// Ones place of year (0-9)
    pub years, set_years: 3, 0;
}
from_register_u8!(Years);

// Alarm registers carry an inverted enable: bit 7 set disables the component.

bitfield! {
    /// Minute alarm register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct MinuteAlarm(u8);
    impl Debug;
    /// Minute alarm disabled (AE_M)
    pub disabled, set_disabled: 7;
    /// Tens place of minutes (0-5)
    pub ten_minutes, set_ten_minutes: 6, 4;
    /// Ones place of minutes (0-9)
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(MinuteAlarm);

bitfield! {
    /// Hour alarm register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct HourAlarm(u8);
    impl Debug;
    /// Hour alarm disabled (AE_H)
    pub disabled, set_disabled: 7;
    /// Tens place of hours (0-2)
    pub ten_hours, set_ten_hours: 5, 4;
    /// Ones place of hours (0-9)
    pub hours, set_hours: 3, 0;
}
from_register_u8!(HourAlarm);

bitfield! {
    /// Day alarm register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct DayAlarm(u8);
    impl Debug;
    /// Day alarm disabled (AE_D)
    pub disabled, set_disabled: 7;
    /// Tens place of day (0-3)
    pub ten_days, set_ten_days: 5, 4;
    /// Ones place of day (0-9)
    pub days, set_days: 3, 0;
}
from_register_u8!(DayAlarm);

bitfield! {
    /// Weekday alarm register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct WeekdayAlarm(u8);
    impl Debug;
    /// Weekday alarm disabled (AE_W)
    pub disabled, set_disabled: 7;
    /// Day of week (0-6)
    pub weekday, set_weekday: 2, 0;
}
from_register_u8!(WeekdayAlarm);

bitfield! {
    /// CLKOUT control register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct ClockOutControl(u8);
    impl Debug;
    /// CLKOUT output active (FE)
    pub active, set_active: 7;
    /// CLKOUT frequency (FD)
    pub from into ClockOutFrequency, frequency, set_frequency: 1, 0;
}
from_register_u8!(ClockOutControl);

bitfield! {
    /// Timer control register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct TimerControl(u8);
    impl Debug;
    /// Timer enabled (TE)
    pub enabled, set_enabled: 7;
    /// Timer source clock (TD)
    pub from into TimerSource, source, set_source: 1, 0;
}
from_register_u8!(TimerControl);

#[cfg(feature = "defmt")]
impl defmt::Format for TimerControl {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "TimerControl({}", self.source());
        if self.enabled() {
            defmt::write!(f, ", enabled");
        }
        defmt::write!(f, ")");
    }
}

/// Host side copy of the chip's sixteen registers.
///
/// Bytes only change through an explicit encode or a successful bus read;
/// a failed transfer leaves the cache untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterCache([u8; REGISTER_COUNT]);

impl RegisterCache {
    /// Creates a cache with every register zeroed.
    #[must_use]
    pub const fn new() -> Self {
        RegisterCache([0; REGISTER_COUNT])
    }

    /// Returns the typed view of one register.
    pub fn get<T: From<u8>>(&self, addr: RegAddr) -> T {
        T::from(self.0[addr as usize])
    }

    /// Stores a typed register value.
    pub fn set<T: Into<u8>>(&mut self, addr: RegAddr, value: T) {
        self.0[addr as usize] = value.into();
    }

    /// Returns `length` bytes starting at `start`.
    ///
    /// # Panics
    /// Panics if the span runs past register 0x0F.
    pub fn span(&self, start: RegAddr, length: usize) -> &[u8] {
        let start = start as usize;
        &self.0[start..start + length]
    }

    /// Copies `data` into the cache at the offset of `start`.
    ///
    /// # Panics
    /// Panics if the data runs past register 0x0F.
    pub fn load(&mut self, start: RegAddr, data: &[u8]) {
        let start = start as usize;
        self.0[start..start + data.len()].copy_from_slice(data);
    }

    /// Returns the whole register file.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; REGISTER_COUNT] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_out_frequency_conversions() {
        assert_eq!(ClockOutFrequency::from(0), ClockOutFrequency::Hz32768);
        assert_eq!(ClockOutFrequency::from(3), ClockOutFrequency::Hz1);
        assert_eq!(u8::from(ClockOutFrequency::Hz1024), 1);
        assert_eq!(u8::from(ClockOutFrequency::Hz32), 2);
    }

    #[test]
    #[should_panic(expected = "Invalid value for TimerSource: 4")]
    fn test_invalid_timer_source_conversion() {
        let _ = TimerSource::from(4);
    }

    #[test]
    fn test_control_status1_bits() {
        let mut reg = ControlStatus1::default();
        reg.set_test1(true);
        assert_eq!(u8::from(reg), 0x80);
        reg.set_stop(true);
        assert_eq!(u8::from(reg), 0xA0);
        reg.set_testc(true);
        assert_eq!(u8::from(reg), 0xA8);

        let reg = ControlStatus1::from(0x08);
        assert!(!reg.test1());
        assert!(!reg.stop());
        assert!(reg.testc());
    }

    #[test]
    fn test_control_status2_bits() {
        let reg = ControlStatus2::from(0x1F);
        assert!(reg.ti_tp());
        assert!(reg.af());
        assert!(reg.tf());
        assert!(reg.aie());
        assert!(reg.tie());

        let mut reg = ControlStatus2::default();
        reg.set_af(true);
        assert_eq!(u8::from(reg), 0x08);
        reg.set_tf(true);
        assert_eq!(u8::from(reg), 0x0C);
    }

    #[test]
    fn test_vl_seconds_register() {
        let reg = VlSeconds::from(0xD9);
        assert!(reg.voltage_low());
        assert_eq!(reg.ten_seconds(), 5);
        assert_eq!(reg.seconds(), 9);

        let reg = VlSeconds::from(0x30);
        assert!(!reg.voltage_low());
        assert_eq!(reg.ten_seconds(), 3);
        assert_eq!(reg.seconds(), 0);
    }

    #[test]
    fn test_century_months_register() {
        let reg = CenturyMonths::from(0x92);
        assert!(reg.century());
        assert_eq!(reg.ten_months(), 1);
        assert_eq!(reg.months(), 2);
    }

    #[test]
    fn test_alarm_disable_bit() {
        let mut reg = MinuteAlarm::default();
        reg.set_ten_minutes(3);
        reg.set_minutes(0);
        assert_eq!(u8::from(reg), 0x30);
        reg.set_disabled(true);
        assert_eq!(u8::from(reg), 0xB0);

        let reg = WeekdayAlarm::from(0x86);
        assert!(reg.disabled());
        assert_eq!(reg.weekday(), 6);
    }

    #[test]
    fn test_timer_control_register() {
        let mut reg = TimerControl::default();
        reg.set_source(TimerSource::OneSixtiethHz);
        reg.set_enabled(true);
        assert_eq!(u8::from(reg), 0x83);

        let reg = TimerControl::from(0x01);
        assert!(!reg.enabled());
        assert_eq!(reg.source(), TimerSource::Hz64);
    }

    #[test]
    fn test_clock_out_control_register() {
        let reg = ClockOutControl::from(0x83);
        assert!(reg.active());
        assert_eq!(reg.frequency(), ClockOutFrequency::Hz1);
    }

    #[test]
    fn test_register_cache_span_and_load() {
        let mut cache = RegisterCache::new();
        cache.load(RegAddr::MinuteAlarm, &[0x30, 0x80, 0x81, 0x82]);
        assert_eq!(cache.span(RegAddr::MinuteAlarm, 4), &[0x30, 0x80, 0x81, 0x82]);
        assert_eq!(cache.as_bytes()[0x08], 0);
        assert_eq!(cache.as_bytes()[0x0D], 0);

        let alarm: MinuteAlarm = cache.get(RegAddr::MinuteAlarm);
        assert_eq!(alarm.ten_minutes(), 3);
        cache.set(RegAddr::Timer, 0x2Au8);
        assert_eq!(cache.span(RegAddr::Timer, 1), &[0x2A]);
    }

    #[test]
    #[should_panic]
    fn test_register_cache_span_past_end() {
        let cache = RegisterCache::new();
        let _ = cache.span(RegAddr::TimerControl, 3);
    }
}
