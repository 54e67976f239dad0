use crate::error::Error;

mod csv;
pub use crate::output::csv::CsvOutput;

pub trait Output {
    fn write_holdings(&mut self) -> Result<(), Error>;
    fn write_series(&mut self) -> Result<(), Error>;
    fn write_allocation(&mut self) -> Result<(), Error>;

    fn write_indicators(&mut self) -> Result<(), Error> {
        self.write_holdings()?;
        self.write_series()?;
        self.write_allocation()
    }
}
