//! Keeping the PCF8563 and a host clock in step.
//!
//! A typical board seeds its system clock from the RTC at power-up with
//! [`set_time_from_rtc`], then lets a network time service discipline the
//! system clock. Whenever that service reports a completed sync it calls
//! [`on_sync_notification`], and the main loop calls [`update_rtc`] to copy
//! the fresh time back into the chip.
//!
//! ```rust,ignore
//! static SYNCED: SyncFlag = SyncFlag::new();
//!
//! // from the network time callback
//! on_sync_notification(&SYNCED, SyncStatus::Completed);
//!
//! // from the main loop
//! update_rtc(&SYNCED, &mut clock, Some(&mut rtc));
//! ```

use core::cell::Cell;

use chrono::{Datelike, NaiveDateTime, Timelike};
use critical_section::Mutex;
use embedded_hal::i2c::I2c;

use crate::Pcf8563;

/// Host side clock holding local time.
pub trait SystemClock {
    /// Current local time, `None` while the clock has never been set.
    fn local_time(&mut self) -> Option<NaiveDateTime>;

    /// Sets the local time.
    fn set_local_time(&mut self, datetime: &NaiveDateTime);
}

/// Progress reported by a network time service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncStatus {
    /// No sync has happened yet
    Reset,
    /// The host clock was just updated
    Completed,
    /// A smooth adjustment is still being applied
    InProgress,
}

/// Latch raised when a network time sync completes.
///
/// Safe to raise from an interrupt or callback context and to consume from
/// the main loop.
pub struct SyncFlag(Mutex<Cell<bool>>);

impl SyncFlag {
    /// A lowered flag.
    pub const fn new() -> Self {
        Self(Mutex::new(Cell::new(false)))
    }

    /// Raises the flag.
    pub fn notify(&self) {
        critical_section::with(|cs| self.0.borrow(cs).set(true));
    }

    /// True if the flag is raised, without consuming it.
    pub fn is_set(&self) -> bool {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }

    /// Consumes the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.0.borrow(cs).replace(false))
    }
}

impl Default for SyncFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SyncFlag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("SyncFlag").field(&self.is_set()).finish()
    }
}

/// Handles a status report from the network time service.
///
/// Raises `flag` only for [`SyncStatus::Completed`].
pub fn on_sync_notification(flag: &SyncFlag, status: SyncStatus) {
    info!("time sync: status {:?}", status);
    if status == SyncStatus::Completed {
        flag.notify();
    }
}

/// Copies the host time into the RTC after a completed sync.
///
/// Does nothing and returns `false` unless `flag` was raised. Otherwise the
/// flag is consumed, the host time is written to `rtc` when one is present,
/// and `true` is returned whether or not that write succeeded.
pub fn update_rtc<I2C, C>(
    flag: &SyncFlag,
    clock: &mut C,
    rtc: Option<&mut Pcf8563<I2C>>,
) -> bool
where
    I2C: I2c,
    C: SystemClock,
{
    if !flag.take() {
        return false;
    }

    let Some(now) = clock.local_time() else {
        error!("time sync: host clock not set");
        return true;
    };
    info!(
        "time sync: {}-{}-{} {}:{}:{}",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    );

    if let Some(rtc) = rtc {
        match rtc.set_datetime(&now) {
            Ok(()) => info!("time sync: RTC updated"),
            Err(_) => error!("time sync: RTC update failed"),
        }
    }
    true
}

/// Seeds the host clock from the RTC.
///
/// Returns `false`, leaving the host clock alone, when the chip cannot be
/// read or does not hold a valid time.
pub fn set_time_from_rtc<I2C, C>(rtc: &mut Pcf8563<I2C>, clock: &mut C) -> bool
where
    I2C: I2c,
    C: SystemClock,
{
    match rtc.datetime() {
        Ok(datetime) => {
            clock.set_local_time(&datetime);
            info!("time sync: RTC valid, local time set");
            true
        }
        Err(_) => {
            error!("time sync: RTC not valid");
            false
        }
    }
}
