//! Result type alias
//!
//! Convenience Result alias that uses [`BeingError`] as the error type.

use super::errors::BeingError;

/// Result type alias for export engine operations
///
/// # Examples
///
/// ```
/// use being_export::domain::result::Result;
/// use being_export::domain::errors::BeingError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(BeingError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, BeingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::BeingError;

    #[test]
    fn test_result_ok() {
        let result: Result<i32> = Ok(42);
        assert!(result.is_ok());
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(BeingError::Validation("test error".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
