mod allocation;
mod cache;
mod holding;
mod iterator;
mod primitive;
mod series;
mod valuation;

pub use allocation::*;
pub use cache::*;
pub use holding::*;
pub use series::*;
pub use valuation::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    Year,
    Month,
    Day,
    Week,
}
