use casemap::error::CasemapError;
use polars::error::PolarsError;

#[derive(thiserror::Error, Debug)]
pub enum CasemapCliError {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    #[error(transparent)]
    PolarsError(#[from] PolarsError),
    #[error(transparent)]
    CasemapError(#[from] CasemapError),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

pub type CasemapCliResult<T> = Result<T, CasemapCliError>;
