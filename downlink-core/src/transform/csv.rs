use std::marker::PhantomData;

use ::csv::ReaderBuilder;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::Transform;
use crate::datasource::PipelineError;

#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    pub delimiter: u8, // b','
    pub has_headers: bool, // true
    /// number of fields can change
    pub flexible: bool, // false, if num fields changes
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        CsvReadOptions {
            delimiter: b',',
            has_headers: true,
            flexible: false,
        }
    }
}

/// Decode a CSV payload into typed rows.
pub struct CsvDecode<T> {
    pub csv_options: CsvReadOptions,
    marker: PhantomData<fn() -> T>,
}

impl<T> CsvDecode<T> {
    pub fn new(csv_options: CsvReadOptions) -> Self {
        CsvDecode {
            csv_options,
            marker: PhantomData,
        }
    }
}

impl<T> Default for CsvDecode<T> {
    fn default() -> Self {
        CsvDecode::new(CsvReadOptions::default())
    }
}

impl<T> Transform for CsvDecode<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Input = Bytes;
    type Output = Vec<T>;

    fn apply(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
        let reader = ReaderBuilder::new()
            .delimiter(self.csv_options.delimiter)
            .has_headers(self.csv_options.has_headers)
            .flexible(self.csv_options.flexible)
            .from_reader(input.as_ref());

        let mut rows = Vec::new();
        for result in reader.into_deserialize::<T>() {
            match result {
                Ok(row) => rows.push(row),
                Err(er) => {
                    return Err(PipelineError::Deserialize {
                        message: er.to_string(),
                        attempted_input: String::from_utf8_lossy(input.as_ref()).to_string(),
                    });
                }
            }
        }
        log::debug!("decoded {} csv rows", rows.len());
        Ok(rows)
    }
}
