//! Slot ticks that drive fork choice.
//!
//! [`ticks`] yields a [`Tick`] at the start of every slot. Fork choice only needs the current time
//! in seconds, which [`Tick::unix_seconds`] provides.
//!
//! The stream is implemented using [`Interval`]. The API of [`Interval`] uses [`Instant`]s, which
//! are opaque. There is no way to directly convert a Unix timestamp to an [`Instant`], so
//! [`ticks`] assumes that an [`Instant`] and a [`SystemTime`] obtained one after the other refer
//! to the same point in time.
//!
//! [`Interval`]: tokio::time::Interval

use core::time::Duration;
use std::time::SystemTime;

use anyhow::Result;
use futures::stream::{Stream, StreamExt as _};
use helper_functions::misc;
use thiserror::Error;
use tokio::time::Instant;
use tokio_stream::wrappers::IntervalStream;
use types::{
    config::Config,
    phase0::{
        consts::GENESIS_SLOT,
        primitives::{Epoch, Slot, UnixSeconds},
    },
    preset::Preset,
};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Tick {
    pub slot: Slot,
}

impl Tick {
    #[must_use]
    pub const fn start_of_slot(slot: Slot) -> Self {
        Self { slot }
    }

    /// Tick of the slot containing `time`. Times before genesis belong to the genesis slot.
    #[must_use]
    pub fn at_time(config: &Config, time: UnixSeconds, genesis_time: UnixSeconds) -> Self {
        let slots_since_genesis = time.saturating_sub(genesis_time) / config.seconds_per_slot;
        Self::start_of_slot(GENESIS_SLOT + slots_since_genesis)
    }

    #[must_use]
    pub fn epoch<P: Preset>(self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot)
    }

    #[must_use]
    pub fn is_start_of_epoch<P: Preset>(self) -> bool {
        misc::is_epoch_start::<P>(self.slot)
    }

    /// Time at which the slot starts.
    ///
    /// Passing this to fork choice makes its store observe the same slot as the tick.
    pub fn unix_seconds(self, config: &Config, genesis_time: UnixSeconds) -> Result<UnixSeconds> {
        (self.slot - GENESIS_SLOT)
            .checked_mul(config.seconds_per_slot.get())
            .and_then(|since_genesis| genesis_time.checked_add(since_genesis))
            .ok_or_else(|| ClockError::TimeOverflow.into())
    }

    fn next(self) -> Result<Self> {
        self.slot
            .checked_add(1)
            .map(Self::start_of_slot)
            .ok_or_else(|| ClockError::RanOutOfSlots.into())
    }
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ClockError {
    #[error("ran out of slots")]
    RanOutOfSlots,
    #[error("time of tick overflowed")]
    TimeOverflow,
}

/// Yields a tick at the start of every slot, beginning with the first slot that starts no earlier
/// than now.
///
/// Ticks missed while the runtime was busy are yielded in a burst so that no slot is skipped.
pub fn ticks(
    config: &Config,
    genesis_time: UnixSeconds,
) -> Result<impl Stream<Item = Result<Tick>>> {
    // This is slightly inaccurate but the error will probably be negligible compared to clock
    // differences between different nodes in the network.
    let now_instant = Instant::now();
    let since_unix_epoch = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?;

    ticks_from(config, genesis_time, now_instant, since_unix_epoch)
}

fn ticks_from(
    config: &Config,
    genesis_time: UnixSeconds,
    now_instant: Instant,
    since_unix_epoch: Duration,
) -> Result<impl Stream<Item = Result<Tick>>> {
    let (mut next_tick, until_next_tick) = next_tick(config, genesis_time, since_unix_epoch)?;

    let start = now_instant
        .checked_add(until_next_tick)
        .ok_or(ClockError::TimeOverflow)?;

    let interval = tokio::time::interval_at(start, config.slot_duration());

    Ok(IntervalStream::new(interval).map(move |_| {
        let current_tick = next_tick;
        next_tick = current_tick.next()?;
        Ok(current_tick)
    }))
}

/// Returns the first tick at or after `since_unix_epoch` along with the time remaining until it.
fn next_tick(
    config: &Config,
    genesis_time: UnixSeconds,
    since_unix_epoch: Duration,
) -> Result<(Tick, Duration)> {
    let unix_epoch_to_genesis = Duration::from_secs(genesis_time);

    // `Duration` does not implement `Div<Duration>`, so we have to do arithmetic on nanoseconds.
    let nanos_since_genesis = since_unix_epoch
        .saturating_sub(unix_epoch_to_genesis)
        .as_nanos();

    let slots_since_genesis =
        u64::try_from(nanos_since_genesis.div_ceil(config.slot_duration().as_nanos()))?;

    let tick = Tick::start_of_slot(GENESIS_SLOT + slots_since_genesis);
    let tick_time = Duration::from_secs(tick.unix_seconds(config, genesis_time)?);

    Ok((tick, tick_time.saturating_sub(since_unix_epoch)))
}
