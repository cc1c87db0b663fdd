//! Operations over the blog entities. Every function takes the connection
//! it runs on, so callers decide the unit of work: pass a
//! `DatabaseTransaction` to make a whole request atomic.

pub mod post;
pub mod post_tag;
pub mod tag;
pub mod user;

use crate::error::AppError;

/// Trimmed value of a required text field, or a validation error naming it.
fn required(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::param_error(format!("{} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}
