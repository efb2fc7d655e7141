//! `DateTime` conversion and register utilities for the PCF8563 RTC.
//!
//! The PCF8563 stores wall-clock time in 7 consecutive registers (0x02-0x08):
//! seconds, minutes, hours, day of month, weekday, month and year, all as
//! binary-coded decimal. Bit 7 of the month register is a century flag that
//! adds 100 to the two digit year, giving a range of 1900-2099.
//!
//! Bit 7 of the seconds register (VL) is set by the chip when clock
//! integrity is no longer guaranteed, e.g. after a supply brown-out.
//!
//! Conversion errors are reported via [`Pcf8563DateTimeError`].

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::{CenturyMonths, Days, Hours, Minutes, VlSeconds, Weekdays, Years};

/// First year representable by the two digit year plus century flag.
pub const BASE_YEAR: i32 = 1900;

/// Encodes a value in 0-99 as packed BCD.
#[must_use]
pub const fn int_to_bcd(value: u8) -> u8 {
    value / 10 * 16 + value % 10
}

/// Decodes a packed BCD byte.
#[must_use]
pub const fn bcd_to_int(bcd: u8) -> u8 {
    bcd / 16 * 10 + bcd % 16
}

/// Internal representation of the PCF8563 date and time registers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Pcf8563DateTime {
    seconds: VlSeconds,
    minutes: Minutes,
    hours: Hours,
    days: Days,
    weekdays: Weekdays,
    months: CenturyMonths,
    years: Years,
}

impl Pcf8563DateTime {
    /// Splits a number into BCD (ones, tens) with validation
    pub(crate) fn make_bcd(value: u32, max_value: u32) -> Result<(u8, u8), Pcf8563DateTimeError> {
        if value > max_value {
            return Err(Pcf8563DateTimeError::InvalidDateTime);
        }
        let ones = u8::try_from(value % 10).map_err(|_| Pcf8563DateTimeError::InvalidDateTime)?;
        let tens = u8::try_from(value / 10).map_err(|_| Pcf8563DateTimeError::InvalidDateTime)?;
        Ok((ones, tens))
    }

    fn convert_year(year: i32) -> Result<(Years, bool), Pcf8563DateTimeError> {
        if year > BASE_YEAR + 199 {
            error!("Year {} is too late! must be before 2100", year);
            return Err(Pcf8563DateTimeError::YearNotBefore2100);
        }
        if year < BASE_YEAR {
            error!("Year {} is too early! must be after 1899", year);
            return Err(Pcf8563DateTimeError::YearNotAfter1899);
        }

        let offset =
            u8::try_from(year - BASE_YEAR).map_err(|_| Pcf8563DateTimeError::InvalidDateTime)?;
        let century = offset >= 100;
        let (ones, tens) = Self::make_bcd(u32::from(offset % 100), 99)?;

        let mut value = Years::default();
        value.set_years(ones);
        value.set_ten_years(tens);
        Ok((value, century))
    }

    pub(crate) fn from_datetime(datetime: &NaiveDateTime) -> Result<Self, Pcf8563DateTimeError> {
        let mut seconds = VlSeconds::default();
        let (ones, tens) = Self::make_bcd(datetime.second(), 59)?;
        seconds.set_seconds(ones);
        seconds.set_ten_seconds(tens);

        let mut minutes = Minutes::default();
        let (ones, tens) = Self::make_bcd(datetime.minute(), 59)?;
        minutes.set_minutes(ones);
        minutes.set_ten_minutes(tens);

        let mut hours = Hours::default();
        let (ones, tens) = Self::make_bcd(datetime.hour(), 23)?;
        hours.set_hours(ones);
        hours.set_ten_hours(tens);

        let mut days = Days::default();
        let (ones, tens) = Self::make_bcd(datetime.day(), 31)?;
        days.set_days(ones);
        days.set_ten_days(tens);

        // 0 = Sunday .. 6 = Saturday, same numbering as the chip
        let mut weekdays = Weekdays::default();
        let (weekday, _) = Self::make_bcd(datetime.weekday().num_days_from_sunday(), 6)?;
        weekdays.set_weekday(weekday);

        let mut months = CenturyMonths::default();
        let (ones, tens) = Self::make_bcd(datetime.month(), 12)?;
        months.set_months(ones);
        months.set_ten_months(tens);

        let (years, century) = Self::convert_year(datetime.year())?;
        months.set_century(century);

        let raw = Pcf8563DateTime {
            seconds,
            minutes,
            hours,
            days,
            weekdays,
            months,
            years,
        };
        debug!("raw={:?}", raw);
        Ok(raw)
    }

    /// True when the chip flagged the stored time as unreliable.
    pub(crate) fn voltage_low(&self) -> bool {
        self.seconds.voltage_low()
    }

    /// The stored weekday is not consulted: chrono derives it from the date.
    pub(crate) fn into_datetime(self) -> Result<NaiveDateTime, Pcf8563DateTimeError> {
        let seconds =
            10 * u32::from(self.seconds.ten_seconds()) + u32::from(self.seconds.seconds());
        let minutes =
            10 * u32::from(self.minutes.ten_minutes()) + u32::from(self.minutes.minutes());
        let hours = 10 * u32::from(self.hours.ten_hours()) + u32::from(self.hours.hours());
        let day = 10 * u32::from(self.days.ten_days()) + u32::from(self.days.days());
        let month = 10 * u32::from(self.months.ten_months()) + u32::from(self.months.months());

        let year_offset = 10 * i32::from(self.years.ten_years()) + i32::from(self.years.years());
        let century_offset = if self.months.century() { 100 } else { 0 };
        let year = BASE_YEAR + year_offset + century_offset;
        debug!(
            "year={} month={} day={} h={} m={} s={}",
            year, month, day, hours, minutes, seconds
        );

        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hours, minutes, seconds))
            .ok_or(Pcf8563DateTimeError::InvalidDateTime)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Pcf8563DateTime {
    fn format(&self, f: defmt::Formatter) {
        let bytes: [u8; 7] = self.into();
        defmt::write!(f, "Pcf8563DateTime({=[u8]})", bytes);
    }
}

impl From<[u8; 7]> for Pcf8563DateTime {
    fn from(data: [u8; 7]) -> Self {
        Pcf8563DateTime {
            seconds: VlSeconds::from(data[0]),
            minutes: Minutes::from(data[1]),
            hours: Hours::from(data[2]),
            days: Days::from(data[3]),
            weekdays: Weekdays::from(data[4]),
            months: CenturyMonths::from(data[5]),
            years: Years::from(data[6]),
        }
    }
}

impl From<&Pcf8563DateTime> for [u8; 7] {
    fn from(dt: &Pcf8563DateTime) -> [u8; 7] {
        [
            u8::from(dt.seconds),
            u8::from(dt.minutes),
            u8::from(dt.hours),
            u8::from(dt.days),
            u8::from(dt.weekdays),
            u8::from(dt.months),
            u8::from(dt.years),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors that can occur during PCF8563 date/time conversion or validation.
pub enum Pcf8563DateTimeError {
    /// The provided or decoded date/time is invalid (e.g., out of range, not representable)
    InvalidDateTime,
    /// The year is not before 2100 (the century flag only covers 1900-2099)
    YearNotBefore2100,
    /// The year is not after 1899
    YearNotAfter1899,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_bcd_round_trip_all_values() {
        for n in 0..=99u8 {
            assert_eq!(bcd_to_int(int_to_bcd(n)), n);
        }
        for tens in 0..=9u8 {
            for ones in 0..=9u8 {
                let bcd = tens << 4 | ones;
                assert_eq!(int_to_bcd(bcd_to_int(bcd)), bcd);
            }
        }
        assert_eq!(int_to_bcd(59), 0x59);
        assert_eq!(bcd_to_int(0x23), 23);
    }

    #[test]
    fn test_make_bcd() {
        assert_eq!(Pcf8563DateTime::make_bcd(0, 59).unwrap(), (0, 0));
        assert_eq!(Pcf8563DateTime::make_bcd(45, 59).unwrap(), (5, 4));
        assert!(matches!(
            Pcf8563DateTime::make_bcd(60, 59),
            Err(Pcf8563DateTimeError::InvalidDateTime)
        ));
    }

    #[test]
    fn test_from_datetime_register_layout() {
        // Thursday
        let dt = ymd_hms(2024, 3, 14, 15, 30, 7);
        let raw = Pcf8563DateTime::from_datetime(&dt).unwrap();
        let arr: [u8; 7] = (&raw).into();
        assert_eq!(arr, [0x07, 0x30, 0x15, 0x14, 0x04, 0x83, 0x24]);
    }

    #[test]
    fn test_twentieth_century_has_no_century_flag() {
        let dt = ymd_hms(1999, 12, 31, 23, 59, 59);
        let raw = Pcf8563DateTime::from_datetime(&dt).unwrap();
        assert!(!raw.months.century());
        let arr: [u8; 7] = (&raw).into();
        assert_eq!(arr[5], 0x12);
        assert_eq!(arr[6], 0x99);
        assert_eq!(raw.into_datetime().unwrap(), dt);
    }

    #[test]
    fn test_century_boundary_years() {
        for dt in [
            ymd_hms(1900, 1, 1, 0, 0, 0),
            ymd_hms(1999, 12, 31, 23, 59, 59),
            ymd_hms(2000, 1, 1, 0, 0, 0),
            ymd_hms(2023, 2, 28, 23, 59, 59),
            ymd_hms(2024, 2, 29, 12, 0, 0),
            ymd_hms(2099, 12, 31, 23, 59, 59),
        ] {
            let raw = Pcf8563DateTime::from_datetime(&dt).unwrap();
            assert_eq!(raw.months.century(), dt.year() >= 2000);
            assert_eq!(raw.into_datetime().unwrap(), dt);
        }
    }

    #[test]
    fn test_year_out_of_range() {
        let err = Pcf8563DateTime::from_datetime(&ymd_hms(1899, 12, 31, 0, 0, 0)).unwrap_err();
        assert_eq!(err, Pcf8563DateTimeError::YearNotAfter1899);
        let err = Pcf8563DateTime::from_datetime(&ymd_hms(2100, 1, 1, 0, 0, 0)).unwrap_err();
        assert_eq!(err, Pcf8563DateTimeError::YearNotBefore2100);
    }

    #[test]
    fn test_weekday_numbering() {
        // 2024-03-10 is a Sunday, 2024-03-16 a Saturday
        let raw = Pcf8563DateTime::from_datetime(&ymd_hms(2024, 3, 10, 0, 0, 0)).unwrap();
        assert_eq!(raw.weekdays.weekday(), 0);
        let raw = Pcf8563DateTime::from_datetime(&ymd_hms(2024, 3, 16, 0, 0, 0)).unwrap();
        assert_eq!(raw.weekdays.weekday(), 6);
    }

    #[test]
    fn test_voltage_low_flag_is_masked_from_seconds() {
        let raw = Pcf8563DateTime::from([0xA5, 0x00, 0x00, 0x01, 0x00, 0x81, 0x00]);
        assert!(raw.voltage_low());
        assert_eq!(raw.into_datetime().unwrap().second(), 25);
    }

    #[test]
    fn test_invalid_bcd_to_datetime() {
        // month 0x13 does not exist
        let raw = Pcf8563DateTime::from([0x00, 0x00, 0x00, 0x01, 0x00, 0x13, 0x24]);
        assert_eq!(
            raw.into_datetime().unwrap_err(),
            Pcf8563DateTimeError::InvalidDateTime
        );
        // February 30th
        let raw = Pcf8563DateTime::from([0x00, 0x00, 0x00, 0x30, 0x00, 0x02, 0x24]);
        assert!(raw.into_datetime().is_err());
    }
}
