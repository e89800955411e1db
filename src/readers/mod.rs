pub mod csv_reader;

pub use csv_reader::{decode_utf8, CsvRows, CsvTableReader};
