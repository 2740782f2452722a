use chrono::NaiveDate;

/// Input shapes accepted for user-supplied dates.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%d %B %Y"];

pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
}

/// Render a user-supplied date for a form payload: ISO on success, an
/// empty field when the input does not parse.
pub fn date_field(input: &str) -> String {
    match parse_date(input) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => String::new(),
    }
}

#[test]
fn test_parse_date_formats() {
    let expected = NaiveDate::from_ymd(2012, 3, 1);
    assert_eq!(parse_date("2012-03-01"), Some(expected));
    assert_eq!(parse_date("2012/03/01"), Some(expected));
    assert_eq!(parse_date("March 1, 2012"), Some(expected));
    assert_eq!(parse_date("1 March 2012"), Some(expected));
    assert_eq!(parse_date("  2012-03-01  "), Some(expected));
}

#[test]
fn test_parse_date_rejects_garbage() {
    assert_eq!(parse_date("not-a-date"), None);
    assert_eq!(parse_date(""), None);
    assert_eq!(parse_date("2012-13-40"), None);
}

#[test]
fn test_date_field_fallback() {
    assert_eq!(date_field("2012/03/01"), "2012-03-01");
    assert_eq!(date_field("not-a-date"), "");
}
