//! Source of the current calendar date
//!
//! Retention filtering and the upper bound of entry navigation both depend on
//! "today". Components take a [`Clock`] so tests can pin the date.

use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

/// Provides the current local date
pub trait Clock: fmt::Debug + Send + Sync {
    /// Today's date in local time
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a fixed date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Shared handle to the system clock
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}
