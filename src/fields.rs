//! Typed views of the PCF8563 register groups.
//!
//! Each group decodes from and encodes into the [`RegisterCache`] and knows
//! the contiguous register span it occupies on the chip. Bit positions live
//! in the register bitfields only; these types deal in plain booleans, enums
//! and integers.

use bitfield::bitfield;

use crate::{
    ClockOutControl, ClockOutFrequency, ControlStatus1, ControlStatus2, DayAlarm, HourAlarm,
    MinuteAlarm, RegAddr, RegisterCache, TimerControl, TimerSource, WeekdayAlarm,
};

/// A register group occupying a contiguous span of chip registers.
pub trait RegisterGroup: Sized {
    /// First register of the group.
    const START: RegAddr;
    /// Number of registers in the group.
    const LENGTH: usize;

    /// Builds the typed view from the cached register bytes.
    fn decode(cache: &RegisterCache) -> Self;

    /// Writes the typed view into the cached register bytes.
    fn encode(&self, cache: &mut RegisterCache);
}

/// Control/status 1 settings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Control {
    /// EXT_CLK test mode
    pub external_clock_test_mode: bool,
    /// RTC source clock stopped, time counting halted
    pub source_clock_stopped: bool,
    /// Power-on reset override facility enabled
    pub power_on_reset_override: bool,
}

impl RegisterGroup for Control {
    const START: RegAddr = RegAddr::ControlStatus1;
    const LENGTH: usize = 1;

    fn decode(cache: &RegisterCache) -> Self {
        let reg: ControlStatus1 = cache.get(RegAddr::ControlStatus1);
        Control {
            external_clock_test_mode: reg.test1(),
            source_clock_stopped: reg.stop(),
            power_on_reset_override: reg.testc(),
        }
    }

    fn encode(&self, cache: &mut RegisterCache) {
        let mut reg = ControlStatus1::default();
        reg.set_test1(self.external_clock_test_mode);
        reg.set_stop(self.source_clock_stopped);
        reg.set_testc(self.power_on_reset_override);
        cache.set(RegAddr::ControlStatus1, reg);
    }
}

/// Control/status 2 settings: interrupt enables and the hardware latched flags.
///
/// The flags are set by the chip on an alarm match or timer expiry and are
/// only cleared by writing them back as `false`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Interrupt {
    /// INT pulses on timer expiry instead of following the timer flag
    pub timer_pulse_mode: bool,
    /// Alarm matched
    pub alarm_flag_active: bool,
    /// Timer counted down to zero
    pub timer_flag_active: bool,
    /// Alarm drives the INT pin
    pub alarm_interrupt_enable: bool,
    /// Timer drives the INT pin
    pub timer_interrupt_enable: bool,
}

impl RegisterGroup for Interrupt {
    const START: RegAddr = RegAddr::ControlStatus2;
    const LENGTH: usize = 1;

    fn decode(cache: &RegisterCache) -> Self {
        let reg: ControlStatus2 = cache.get(RegAddr::ControlStatus2);
        Interrupt {
            timer_pulse_mode: reg.ti_tp(),
            alarm_flag_active: reg.af(),
            timer_flag_active: reg.tf(),
            alarm_interrupt_enable: reg.aie(),
            timer_interrupt_enable: reg.tie(),
        }
    }

    fn encode(&self, cache: &mut RegisterCache) {
        let mut reg = ControlStatus2::default();
        reg.set_ti_tp(self.timer_pulse_mode);
        reg.set_af(self.alarm_flag_active);
        reg.set_tf(self.timer_flag_active);
        reg.set_aie(self.alarm_interrupt_enable);
        reg.set_tie(self.timer_interrupt_enable);
        cache.set(RegAddr::ControlStatus2, reg);
    }
}

bitfield! {
    /// Latched interrupts returned by [`crate::Pcf8563::get_interrupt`].
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct InterruptFlags(u8);
    impl Debug;
    /// The alarm fired
    pub alarm, set_alarm: 1;
    /// The timer elapsed
    pub timer, set_timer: 0;
}

impl InterruptFlags {
    /// Raw mask: 0x02 alarm, 0x01 timer.
    #[must_use]
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// True when neither interrupt was latched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for InterruptFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "InterruptFlags(alarm={} timer={})", self.alarm(), self.timer());
    }
}

/// One component of the alarm. `value` is meaningless while disabled.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmField {
    /// The component takes part in the alarm match
    pub enabled: bool,
    /// Value to match
    pub value: u8,
}

impl AlarmField {
    /// An enabled component matching `value`.
    #[must_use]
    pub const fn enabled(value: u8) -> Self {
        AlarmField {
            enabled: true,
            value,
        }
    }
}

/// Alarm settings. The alarm fires when every enabled component matches.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Alarm {
    /// Minute, 0-59
    pub minute: AlarmField,
    /// Hour, 0-23
    pub hour: AlarmField,
    /// Day of month, 1-31
    pub day: AlarmField,
    /// Weekday, 0-6 with 0 = Sunday
    pub weekday: AlarmField,
}

fn bcd_value(tens: u8, ones: u8) -> u8 {
    10 * tens + ones
}

impl RegisterGroup for Alarm {
    const START: RegAddr = RegAddr::MinuteAlarm;
    const LENGTH: usize = 4;

    fn decode(cache: &RegisterCache) -> Self {
        let minute: MinuteAlarm = cache.get(RegAddr::MinuteAlarm);
        let hour: HourAlarm = cache.get(RegAddr::HourAlarm);
        let day: DayAlarm = cache.get(RegAddr::DayAlarm);
        let weekday: WeekdayAlarm = cache.get(RegAddr::WeekdayAlarm);
        Alarm {
            minute: AlarmField {
                enabled: !minute.disabled(),
                value: bcd_value(minute.ten_minutes(), minute.minutes()),
            },
            hour: AlarmField {
                enabled: !hour.disabled(),
                value: bcd_value(hour.ten_hours(), hour.hours()),
            },
            day: AlarmField {
                enabled: !day.disabled(),
                value: bcd_value(day.ten_days(), day.days()),
            },
            weekday: AlarmField {
                enabled: !weekday.disabled(),
                value: weekday.weekday(),
            },
        }
    }

    fn encode(&self, cache: &mut RegisterCache) {
        let mut minute = MinuteAlarm::default();
        minute.set_disabled(!self.minute.enabled);
        minute.set_ten_minutes(self.minute.value / 10);
        minute.set_minutes(self.minute.value % 10);
        cache.set(RegAddr::MinuteAlarm, minute);

        let mut hour = HourAlarm::default();
        hour.set_disabled(!self.hour.enabled);
        hour.set_ten_hours(self.hour.value / 10);
        hour.set_hours(self.hour.value % 10);
        cache.set(RegAddr::HourAlarm, hour);

        let mut day = DayAlarm::default();
        day.set_disabled(!self.day.enabled);
        day.set_ten_days(self.day.value / 10);
        day.set_days(self.day.value % 10);
        cache.set(RegAddr::DayAlarm, day);

        let mut weekday = WeekdayAlarm::default();
        weekday.set_disabled(!self.weekday.enabled);
        weekday.set_weekday(self.weekday.value);
        cache.set(RegAddr::WeekdayAlarm, weekday);
    }
}

impl Alarm {
    /// Builds alarm settings from optional components.
    ///
    /// A component is enabled only when present and in range (minute 0-59,
    /// hour 0-23, day 1-31, weekday 0-6); anything else disables it and keeps
    /// the previous value from `self`.
    #[must_use]
    pub fn with_components(
        &self,
        minute: Option<u8>,
        hour: Option<u8>,
        day: Option<u8>,
        weekday: Option<u8>,
    ) -> Self {
        fn pick(previous: AlarmField, requested: Option<u8>, min: u8, max: u8) -> AlarmField {
            match requested {
                Some(value) if (min..=max).contains(&value) => AlarmField::enabled(value),
                _ => AlarmField {
                    enabled: false,
                    value: previous.value,
                },
            }
        }

        Alarm {
            minute: pick(self.minute, minute, 0, 59),
            hour: pick(self.hour, hour, 0, 23),
            day: pick(self.day, day, 1, 31),
            weekday: pick(self.weekday, weekday, 0, 6),
        }
    }
}

/// CLKOUT pin settings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockOut {
    /// Square wave is driven on CLKOUT
    pub active: bool,
    /// Square wave frequency
    pub frequency: ClockOutFrequency,
}

impl RegisterGroup for ClockOut {
    const START: RegAddr = RegAddr::ClockOutControl;
    const LENGTH: usize = 1;

    fn decode(cache: &RegisterCache) -> Self {
        let reg: ClockOutControl = cache.get(RegAddr::ClockOutControl);
        ClockOut {
            active: reg.active(),
            frequency: reg.frequency(),
        }
    }

    fn encode(&self, cache: &mut RegisterCache) {
        let mut reg = ClockOutControl::default();
        reg.set_active(self.active);
        reg.set_frequency(self.frequency);
        cache.set(RegAddr::ClockOutControl, reg);
    }
}

/// Countdown timer settings. The timer elapses after `count` periods of `source`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timer {
    /// Timer is counting
    pub enabled: bool,
    /// Source clock
    pub source: TimerSource,
    /// Countdown value, 0-255
    pub count: u8,
}

impl RegisterGroup for Timer {
    const START: RegAddr = RegAddr::TimerControl;
    const LENGTH: usize = 2;

    fn decode(cache: &RegisterCache) -> Self {
        let reg: TimerControl = cache.get(RegAddr::TimerControl);
        Timer {
            enabled: reg.enabled(),
            source: reg.source(),
            count: cache.get(RegAddr::Timer),
        }
    }

    fn encode(&self, cache: &mut RegisterCache) {
        let mut reg = TimerControl::default();
        reg.set_enabled(self.enabled);
        reg.set_source(self.source);
        cache.set(RegAddr::TimerControl, reg);
        cache.set(RegAddr::Timer, self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<G: RegisterGroup + PartialEq + core::fmt::Debug>(group: G) {
        let mut cache = RegisterCache::new();
        group.encode(&mut cache);
        assert_eq!(G::decode(&cache), group);
    }

    #[test]
    fn test_control_layout() {
        let mut cache = RegisterCache::new();
        Control {
            external_clock_test_mode: true,
            source_clock_stopped: true,
            power_on_reset_override: true,
        }
        .encode(&mut cache);
        assert_eq!(cache.as_bytes()[0x00], 0xA8);

        cache.load(RegAddr::ControlStatus1, &[0x20]);
        let control = Control::decode(&cache);
        assert!(!control.external_clock_test_mode);
        assert!(control.source_clock_stopped);
        assert!(!control.power_on_reset_override);
    }

    #[test]
    fn test_interrupt_layout() {
        let mut cache = RegisterCache::new();
        cache.load(RegAddr::ControlStatus2, &[0x1F]);
        let interrupt = Interrupt::decode(&cache);
        assert!(interrupt.timer_pulse_mode);
        assert!(interrupt.alarm_flag_active);
        assert!(interrupt.timer_flag_active);
        assert!(interrupt.alarm_interrupt_enable);
        assert!(interrupt.timer_interrupt_enable);

        Interrupt {
            alarm_flag_active: true,
            timer_interrupt_enable: true,
            ..Default::default()
        }
        .encode(&mut cache);
        assert_eq!(cache.as_bytes()[0x01], 0x09);
    }

    #[test]
    fn test_alarm_enable_is_inverted() {
        let mut cache = RegisterCache::new();
        Alarm {
            minute: AlarmField::enabled(30),
            hour: AlarmField {
                enabled: false,
                value: 12,
            },
            day: AlarmField::enabled(31),
            weekday: AlarmField {
                enabled: false,
                value: 6,
            },
        }
        .encode(&mut cache);
        assert_eq!(cache.span(RegAddr::MinuteAlarm, 4), &[0x30, 0x92, 0x31, 0x86]);

        cache.load(RegAddr::MinuteAlarm, &[0x80, 0x23, 0x81, 0x00]);
        let alarm = Alarm::decode(&cache);
        assert!(!alarm.minute.enabled);
        assert_eq!(alarm.hour, AlarmField::enabled(23));
        assert!(!alarm.day.enabled);
        assert_eq!(alarm.day.value, 1);
        assert_eq!(alarm.weekday, AlarmField::enabled(0));
    }

    #[test]
    fn test_alarm_with_components() {
        let previous = Alarm {
            hour: AlarmField::enabled(7),
            ..Default::default()
        };
        let alarm = previous.with_components(Some(30), None, None, None);
        assert_eq!(alarm.minute, AlarmField::enabled(30));
        assert!(!alarm.hour.enabled);
        assert_eq!(alarm.hour.value, 7);
        assert!(!alarm.day.enabled);
        assert!(!alarm.weekday.enabled);

        let alarm = previous.with_components(Some(60), Some(23), Some(0), Some(7));
        assert!(!alarm.minute.enabled);
        assert_eq!(alarm.hour, AlarmField::enabled(23));
        assert!(!alarm.day.enabled);
        assert!(!alarm.weekday.enabled);

        let alarm = previous.with_components(Some(59), Some(0), Some(31), Some(6));
        assert!(alarm.minute.enabled && alarm.hour.enabled);
        assert!(alarm.day.enabled && alarm.weekday.enabled);

        let alarm = previous.with_components(None, None, None, None);
        assert!(!alarm.minute.enabled && !alarm.hour.enabled);
        assert!(!alarm.day.enabled && !alarm.weekday.enabled);
    }

    #[test]
    fn test_clock_out_and_timer_layout() {
        let mut cache = RegisterCache::new();
        ClockOut {
            active: true,
            frequency: ClockOutFrequency::Hz32,
        }
        .encode(&mut cache);
        Timer {
            enabled: true,
            source: TimerSource::Hz64,
            count: 200,
        }
        .encode(&mut cache);
        assert_eq!(cache.span(RegAddr::ClockOutControl, 3), &[0x82, 0x81, 200]);
    }

    #[test]
    fn test_group_round_trips() {
        round_trip(Control {
            power_on_reset_override: true,
            ..Default::default()
        });
        round_trip(Interrupt {
            timer_pulse_mode: true,
            timer_flag_active: true,
            alarm_interrupt_enable: true,
            ..Default::default()
        });
        round_trip(Alarm {
            minute: AlarmField::enabled(45),
            hour: AlarmField::enabled(9),
            day: AlarmField::enabled(15),
            weekday: AlarmField::enabled(3),
        });
        round_trip(ClockOut {
            active: false,
            frequency: ClockOutFrequency::Hz1024,
        });
        round_trip(Timer {
            enabled: false,
            source: TimerSource::OneSixtiethHz,
            count: 255,
        });
    }

    #[test]
    fn test_interrupt_flags_mask() {
        let mut flags = InterruptFlags::default();
        assert!(flags.is_empty());
        flags.set_alarm(true);
        assert_eq!(flags.bits(), 0x02);
        flags.set_timer(true);
        assert_eq!(flags.bits(), 0x03);
        assert!(flags.alarm() && flags.timer());
    }
}
