use crate::error::AppError;

/// Parses the `patient_id` path segment; the `patientId` field is declared as
/// a 32-bit integer in the collection layout.
pub fn parse_patient_id(raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .map_err(|_| AppError::bad_request(format!("invalid patient id: {raw}")))
}

/// Splits the comma-separated membership list, dropping blank entries.
/// Absent or empty input yields an empty set.
pub fn split_membership_list(raw: Option<&str>) -> Vec<String> {
    raw.map_or_else(Vec::new, |value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_ids() {
        assert_eq!(parse_patient_id("12345").unwrap(), 12345);
    }

    #[test]
    fn rejects_non_numeric_ids() {
        assert!(parse_patient_id("abc").is_err());
        assert!(parse_patient_id("12.5").is_err());
        assert!(parse_patient_id("").is_err());
    }

    #[test]
    fn absent_membership_list_is_empty() {
        assert!(split_membership_list(None).is_empty());
        assert!(split_membership_list(Some("")).is_empty());
        assert!(split_membership_list(Some(" , ,")).is_empty());
    }

    #[test]
    fn splits_and_trims_entries() {
        assert_eq!(
            split_membership_list(Some("123-45-6789, 987-65-4321")),
            vec!["123-45-6789".to_string(), "987-65-4321".to_string()]
        );
    }
}
