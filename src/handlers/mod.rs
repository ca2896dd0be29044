//! HTTP handlers, grouped by surface. Every handler returns `Result<_, AppError>` so
//! failures flow through the single error-to-response mapping.

pub mod account;
pub mod articles;
pub mod categories;
pub mod countries;
pub mod public;
pub mod users;

use garde::Validate;

use crate::error::AppError;

/// Runs the payload's `garde` rules, turning a report into `AppError::Validation`.
pub(crate) fn validated<T>(payload: T) -> Result<T, AppError>
where
    T: Validate,
    T::Context: Default,
{
    payload.validate()?;
    Ok(payload)
}
