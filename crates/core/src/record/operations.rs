use super::error::ValidationError;
use super::requests::{PageQuery, UpsertInput};

const MAX_CODE_LEN: usize = 255;

/// Largest page size a caller may ask for.
const MAX_PAGE_LIMIT: i64 = 1000;

/// Validates every element of an upsert batch.
pub fn validate_inputs(inputs: &[UpsertInput]) -> Result<(), ValidationError> {
    for (index, input) in inputs.iter().enumerate() {
        if input.code.trim().is_empty() {
            return Err(ValidationError::EmptyCode { index });
        }
        if input.code.len() > MAX_CODE_LEN {
            return Err(ValidationError::CodeTooLong { index });
        }
    }
    Ok(())
}

/// Validates pagination parameters.
pub fn validate_page_query(query: &PageQuery) -> Result<(), ValidationError> {
    if query.page < 1 {
        return Err(ValidationError::InvalidPage);
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&query.limit) {
        return Err(ValidationError::InvalidLimit);
    }
    // The row offset of the page has to fit in an i64.
    if (query.page - 1).checked_mul(query.limit).is_none() {
        return Err(ValidationError::PageOutOfRange);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_inputs_accepts_codes() {
        let inputs = vec![UpsertInput::create("A"), UpsertInput::create("B")];
        assert!(validate_inputs(&inputs).is_ok());
    }

    #[test]
    fn test_validate_inputs_accepts_empty_batch() {
        assert!(validate_inputs(&[]).is_ok());
    }

    #[test]
    fn test_validate_inputs_rejects_blank_code() {
        let inputs = vec![UpsertInput::create("A"), UpsertInput::create("  ")];
        assert_eq!(
            validate_inputs(&inputs),
            Err(ValidationError::EmptyCode { index: 1 })
        );
    }

    #[test]
    fn test_validate_inputs_rejects_long_code() {
        let inputs = vec![UpsertInput::create("x".repeat(256))];
        assert_eq!(
            validate_inputs(&inputs),
            Err(ValidationError::CodeTooLong { index: 0 })
        );
    }

    #[test]
    fn test_validate_page_query() {
        assert!(validate_page_query(&PageQuery { page: 1, limit: 25 }).is_ok());
        assert_eq!(
            validate_page_query(&PageQuery { page: 0, limit: 10 }),
            Err(ValidationError::InvalidPage)
        );
        assert_eq!(
            validate_page_query(&PageQuery { page: 1, limit: 0 }),
            Err(ValidationError::InvalidLimit)
        );
    }

    #[test]
    fn test_validate_page_query_bounds() {
        assert!(validate_page_query(&PageQuery { page: 1, limit: MAX_PAGE_LIMIT }).is_ok());
        assert_eq!(
            validate_page_query(&PageQuery { page: 1, limit: MAX_PAGE_LIMIT + 1 }),
            Err(ValidationError::InvalidLimit)
        );
        assert_eq!(
            validate_page_query(&PageQuery { page: 1, limit: i64::MAX }),
            Err(ValidationError::InvalidLimit)
        );
        assert_eq!(
            validate_page_query(&PageQuery { page: i64::MAX, limit: 2 }),
            Err(ValidationError::PageOutOfRange)
        );
        assert!(validate_page_query(&PageQuery { page: i64::MAX, limit: 1 }).is_ok());
    }
}
