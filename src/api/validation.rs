use super::ApiError;

pub const MAX_PAGE_SIZE: u64 = 100;

pub fn validate_id(resource: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {} ID: {}. ID must be a positive integer",
            resource, id
        )));
    }
    Ok(id)
}

pub fn validate_pagination(page: u64, limit: u64) -> Result<(u64, u64), ApiError> {
    if page == 0 {
        return Err(ApiError::validation("Page must be at least 1"));
    }

    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {}. Limit must be between 1 and {}",
            limit, MAX_PAGE_SIZE
        )));
    }

    Ok((page, limit))
}

pub fn validate_days(days: i64) -> Result<i64, ApiError> {
    const MAX_DAYS: i64 = 365;

    if !(0..=MAX_DAYS).contains(&days) {
        return Err(ApiError::validation(format!(
            "Invalid days: {}. Days must be between 0 and {}",
            days, MAX_DAYS
        )));
    }
    Ok(days)
}

pub fn validate_required<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("Account", 1).is_ok());
        assert!(validate_id("Account", 0).is_err());
        assert!(validate_id("Payment", -3).is_err());
    }

    #[test]
    fn test_validate_pagination() {
        assert_eq!(validate_pagination(2, 20).unwrap(), (2, 20));
        assert!(validate_pagination(0, 20).is_err());
        assert!(validate_pagination(1, 0).is_err());
        assert!(validate_pagination(1, 101).is_err());
    }

    #[test]
    fn test_validate_days() {
        assert!(validate_days(7).is_ok());
        assert!(validate_days(-1).is_err());
        assert!(validate_days(366).is_err());
    }

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("Reason", "  late ").unwrap(), "late");
        assert!(validate_required("Reason", "   ").is_err());
    }
}
