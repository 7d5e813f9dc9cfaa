//! Shared utility functions for SPR crates.

/// School year label helpers
pub mod years {
    use chrono::{Datelike, NaiveDate};

    /// Extract the starting calendar year from a school year label.
    ///
    /// Accepts "2023-2024", "2023/2024", "2023 - 2024" and bare "2024".
    /// Returns the first run of four digits found in the label.
    pub fn start_year(label: &str) -> Option<i32> {
        let bytes = label.as_bytes();
        let mut run_start = None;
        for (i, b) in bytes.iter().enumerate() {
            if b.is_ascii_digit() {
                let start = *run_start.get_or_insert(i);
                if i + 1 - start == 4 {
                    let next_is_digit = bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
                    if !next_is_digit {
                        return label[start..=i].parse().ok();
                    }
                }
            } else {
                run_start = None;
            }
        }
        None
    }

    /// The school year a date falls in. School years start in September,
    /// so 2024-10-01 belongs to the 2024-2025 year (start year 2024).
    pub fn school_year_for_date(date: &NaiveDate) -> i32 {
        if date.month() >= 9 {
            date.year()
        } else {
            date.year() - 1
        }
    }

    /// Format a start year as a two-year label, e.g. 2023 -> "2023-2024".
    pub fn format_label(start: i32) -> String {
        format!("{}-{}", start, start + 1)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_start_year() {
            assert_eq!(start_year("2023-2024"), Some(2023));
            assert_eq!(start_year("2023/2024"), Some(2023));
            assert_eq!(start_year("Année 2021 - 2022"), Some(2021));
            assert_eq!(start_year("2024"), Some(2024));
            assert_eq!(start_year("20245"), None);
            assert_eq!(start_year("Session A"), None);
        }

        #[test]
        fn test_school_year_for_date() {
            let sep1 = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
            assert_eq!(school_year_for_date(&sep1), 2024);

            let jun30 = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
            assert_eq!(school_year_for_date(&jun30), 2024);
        }

        #[test]
        fn test_format_label() {
            assert_eq!(format_label(2023), "2023-2024");
            assert_eq!(start_year(&format_label(2019)), Some(2019));
        }
    }
}

/// Text matching helpers
pub mod text {
    /// Case-insensitive substring test: does `haystack` contain `needle`?
    ///
    /// An empty (or all-whitespace) needle never matches.
    pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
        let needle = needle.trim();
        if needle.is_empty() {
            return false;
        }
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }

    /// Case-insensitive equality after trimming.
    pub fn eq_ignore_case(a: &str, b: &str) -> bool {
        a.trim().to_lowercase() == b.trim().to_lowercase()
    }

}
