use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid filters: {0}")]
    InvalidFilters(String),
}
