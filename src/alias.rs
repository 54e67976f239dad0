pub type Date = chrono::NaiveDate;
pub type DateTime = chrono::NaiveDateTime;
