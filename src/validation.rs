use crate::models::KlineInterval;
use thiserror::Error;

pub const MAX_PAGE_LIMIT: i64 = 1000;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid Solana address format: {0}")]
    InvalidSolanaAddress(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub fn validate_solana_address(address: &str) -> Result<(), ValidationError> {
    // Check if address is empty
    if address.trim().is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }

    // Decode base58 string
    let decoded = match bs58::decode(address).into_vec() {
        Ok(bytes) => bytes,
        Err(_) => return Err(ValidationError::InvalidSolanaAddress(address.to_string())),
    };

    // Validate length (Solana addresses are 32 bytes)
    if decoded.len() != 32 {
        return Err(ValidationError::InvalidSolanaAddress(address.to_string()));
    }

    Ok(())
}

pub fn validate_timestamp(name: &str, value: &str) -> Result<i64, ValidationError> {
    match value.trim().parse::<i64>() {
        Ok(ts) if ts >= 0 => Ok(ts),
        _ => Err(ValidationError::InvalidParameter(format!(
            "{} must be a non-negative unix timestamp",
            name
        ))),
    }
}

pub fn validate_offset(value: Option<&str>) -> Result<i64, ValidationError> {
    let Some(value) = value else {
        return Ok(0);
    };
    match value.trim().parse::<i64>() {
        Ok(offset) if offset >= 0 => Ok(offset),
        _ => Err(ValidationError::InvalidParameter(
            "offset must be a non-negative integer".to_string(),
        )),
    }
}

pub fn validate_limit(value: Option<&str>) -> Result<i64, ValidationError> {
    let Some(value) = value else {
        return Ok(100);
    };
    match value.trim().parse::<i64>() {
        Ok(limit) if (1..=MAX_PAGE_LIMIT).contains(&limit) => Ok(limit),
        _ => Err(ValidationError::InvalidParameter(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        ))),
    }
}

pub fn validate_interval(value: &str) -> Result<KlineInterval, ValidationError> {
    value.parse().map_err(ValidationError::InvalidParameter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_real_address() {
        assert!(validate_solana_address("9ii1FEiWSgDzXAbwj2oTmJXzkfCw78mnHwPQv9WQ5iTn").is_ok());
    }

    #[test]
    fn rejects_short_or_non_base58_addresses() {
        assert!(matches!(
            validate_solana_address("abc"),
            Err(ValidationError::InvalidSolanaAddress(_))
        ));
        assert!(matches!(
            validate_solana_address("0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl"),
            Err(ValidationError::InvalidSolanaAddress(_))
        ));
        assert!(matches!(
            validate_solana_address(" "),
            Err(ValidationError::MissingParameter(_))
        ));
    }

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(validate_offset(None).unwrap(), 0);
        assert_eq!(validate_limit(None).unwrap(), 100);
        assert_eq!(validate_limit(Some("1000")).unwrap(), 1000);
        assert!(validate_limit(Some("0")).is_err());
        assert!(validate_limit(Some("1001")).is_err());
        assert!(validate_offset(Some("-1")).is_err());
    }

    #[test]
    fn interval_must_be_known() {
        assert_eq!(validate_interval("5m").unwrap(), KlineInterval::FiveMinutes);
        assert!(validate_interval("1d").is_err());
    }
}
