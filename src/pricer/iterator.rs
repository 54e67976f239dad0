use crate::alias::Date;
use crate::pricer::Step;
use chrono::{Datelike, Days, Months};

fn end_of_month(date: Date) -> Option<Date> {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.checked_sub_days(Days::new(1)))
}

impl Step {
    /// Last day of the period containing `date`.
    fn period_end(&self, date: Date) -> Option<Date> {
        match self {
            Step::Day => Some(date),
            Step::Week => {
                let to_sunday = 6 - u64::from(date.weekday().num_days_from_monday());
                date.checked_add_days(Days::new(to_sunday))
            }
            Step::Month => end_of_month(date),
            Step::Year => Date::from_ymd_opt(date.year(), 12, 31),
        }
    }

    fn next_period_end(&self, period_end: Date) -> Option<Date> {
        match self {
            Step::Day => period_end.checked_add_days(Days::new(1)),
            Step::Week => period_end.checked_add_days(Days::new(7)),
            Step::Month => period_end
                .checked_add_days(Days::new(1))
                .and_then(end_of_month),
            Step::Year => Date::from_ymd_opt(period_end.year() + 1, 12, 31),
        }
    }
}

/// Period ends between `begin` and `end`, `end` itself always last.
pub struct DateByStepIterator {
    current: Option<Date>,
    end: Date,
    step: Step,
}

impl DateByStepIterator {
    pub fn new(begin: Date, end: Date, step: Step) -> Self {
        Self {
            current: step.period_end(begin),
            end,
            step,
        }
    }
}

impl Iterator for DateByStepIterator {
    type Item = Date;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        if current >= self.end {
            self.current = None;
            return Some(self.end);
        }
        self.current = self.step.next_period_end(current);
        Some(current)
    }
}
