//! Change list filters for date fields.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// Date range offered in the change list sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
	Any,
	Today,
	Past7Days,
	ThisMonth,
	ThisYear,
}

impl DateFilter {
	pub const ALL: [DateFilter; 5] = [
		DateFilter::Any,
		DateFilter::Today,
		DateFilter::Past7Days,
		DateFilter::ThisMonth,
		DateFilter::ThisYear,
	];

	/// Parse a query parameter value; unknown values mean no filtering
	///
	/// # Examples
	///
	/// ```
	/// use mysite::admin::DateFilter;
	///
	/// assert_eq!(DateFilter::from_param("past_7_days"), DateFilter::Past7Days);
	/// assert_eq!(DateFilter::from_param("bogus"), DateFilter::Any);
	/// ```
	pub fn from_param(value: &str) -> Self {
		match value {
			"today" => DateFilter::Today,
			"past_7_days" => DateFilter::Past7Days,
			"this_month" => DateFilter::ThisMonth,
			"this_year" => DateFilter::ThisYear,
			_ => DateFilter::Any,
		}
	}

	pub fn param(self) -> Option<&'static str> {
		match self {
			DateFilter::Any => None,
			DateFilter::Today => Some("today"),
			DateFilter::Past7Days => Some("past_7_days"),
			DateFilter::ThisMonth => Some("this_month"),
			DateFilter::ThisYear => Some("this_year"),
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			DateFilter::Any => "Any date",
			DateFilter::Today => "Today",
			DateFilter::Past7Days => "Past 7 days",
			DateFilter::ThisMonth => "This month",
			DateFilter::ThisYear => "This year",
		}
	}

	/// Half-open `[start, end)` range relative to `now`, in UTC
	pub fn range(self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
		let today = now.date_naive();
		let tomorrow = today + Duration::days(1);
		let (start, end) = match self {
			DateFilter::Any => return None,
			DateFilter::Today => (today, tomorrow),
			DateFilter::Past7Days => (today - Duration::days(7), tomorrow),
			DateFilter::ThisMonth => {
				let first = today.with_day(1)?;
				let next = if first.month() == 12 {
					NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
				} else {
					NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
				};
				(first, next)
			}
			DateFilter::ThisYear => (
				NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
				NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?,
			),
		};
		Some((midnight(start)?, midnight(end)?))
	}
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
	Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// One link in a filter's sidebar block
#[derive(Debug, Clone, Serialize)]
pub struct FilterChoice {
	pub value: Option<String>,
	pub label: String,
	pub selected: bool,
	/// Query string selecting this choice, other parameters preserved
	pub query: String,
}

/// Sidebar block for one `list_filter` field
#[derive(Debug, Clone, Serialize)]
pub struct FilterInfo {
	pub field: String,
	pub title: String,
	pub choices: Vec<FilterChoice>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
	}

	#[rstest]
	#[case(DateFilter::Today, at(2024, 3, 15, 0), at(2024, 3, 16, 0))]
	#[case(DateFilter::Past7Days, at(2024, 3, 8, 0), at(2024, 3, 16, 0))]
	#[case(DateFilter::ThisMonth, at(2024, 3, 1, 0), at(2024, 4, 1, 0))]
	#[case(DateFilter::ThisYear, at(2024, 1, 1, 0), at(2025, 1, 1, 0))]
	fn test_ranges(
		#[case] filter: DateFilter,
		#[case] start: DateTime<Utc>,
		#[case] end: DateTime<Utc>,
	) {
		assert_eq!(filter.range(at(2024, 3, 15, 13)), Some((start, end)));
	}

	#[rstest]
	fn test_december_rolls_over() {
		let (_, end) = DateFilter::ThisMonth.range(at(2024, 12, 31, 23)).unwrap();
		assert_eq!(end, at(2025, 1, 1, 0));
	}

	#[rstest]
	fn test_any_has_no_range() {
		assert!(DateFilter::Any.range(Utc::now()).is_none());
		assert!(DateFilter::Any.param().is_none());
	}

	#[rstest]
	fn test_params_round_trip() {
		for filter in DateFilter::ALL {
			if let Some(param) = filter.param() {
				assert_eq!(DateFilter::from_param(param), filter);
			}
		}
	}
}
