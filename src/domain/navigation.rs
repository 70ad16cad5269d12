use crate::domain::models::{NavDirection, RangeUnit};
use chrono::{DateTime, Datelike, Days, Local, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

const BACKWARD_LIMIT_MONTHS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalZone {
    #[default]
    System,
    Named(Tz),
}

impl LocalZone {
    pub fn from_name(name: Option<&str>) -> Result<Self, String> {
        let Some(name) = name.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(Self::System);
        };
        name.parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| format!("unknown timezone '{name}'"))
    }

    pub fn date_of(&self, moment: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::System => moment.with_timezone(&Local).date_naive(),
            Self::Named(zone) => moment.with_timezone(zone).date_naive(),
        }
    }

    pub fn format_timestamp(&self, moment: DateTime<Utc>) -> String {
        match self {
            Self::System => crate::domain::models::format_timestamp(moment, &Local),
            Self::Named(zone) => crate::domain::models::format_timestamp(moment, zone),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct NavigationCursor {
    pub date: NaiveDate,
    pub range: RangeUnit,
}

impl NavigationCursor {
    pub fn new(date: NaiveDate, range: RangeUnit) -> Self {
        Self { date, range }
    }

    pub fn with_range(self, range: RangeUnit) -> Self {
        Self { range, ..self }
    }

    /// Moves one range unit. A backward move landing before one year ago is
    /// rejected with `None`; `today` is evaluated by the caller on every call.
    pub fn navigate(&self, direction: NavDirection, today: NaiveDate) -> Option<Self> {
        let date = self.step(direction)?;
        if direction == NavDirection::Prev && date < earliest_navigable_date(today)? {
            return None;
        }
        Some(Self { date, ..*self })
    }

    fn step(&self, direction: NavDirection) -> Option<NaiveDate> {
        match (self.range, direction) {
            (RangeUnit::Day, NavDirection::Prev) => self.date.checked_sub_days(Days::new(1)),
            (RangeUnit::Day, NavDirection::Next) => self.date.checked_add_days(Days::new(1)),
            (RangeUnit::Week, NavDirection::Prev) => self.date.checked_sub_days(Days::new(7)),
            (RangeUnit::Week, NavDirection::Next) => self.date.checked_add_days(Days::new(7)),
            (RangeUnit::Month, NavDirection::Prev) => self.date.checked_sub_months(Months::new(1)),
            (RangeUnit::Month, NavDirection::Next) => self.date.checked_add_months(Months::new(1)),
        }
    }

    pub fn header_label(&self) -> String {
        match self.range {
            RangeUnit::Day => self.date.format("%A, %B %-d, %Y").to_string(),
            RangeUnit::Week => {
                let start = week_start(self.date);
                let end = start + Days::new(6);
                format!("{} - {}", start.format("%b %-d, %Y"), end.format("%b %-d, %Y"))
            }
            RangeUnit::Month => self.date.format("%B %Y").to_string(),
        }
    }
}

pub fn earliest_navigable_date(today: NaiveDate) -> Option<NaiveDate> {
    today.checked_sub_months(Months::new(BACKWARD_LIMIT_MONTHS))
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_sunday()))
}
