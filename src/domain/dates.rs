//! Publication dates: parsing API timestamps and formatting them as
//! "dd MMMM yyyy" with Brazilian Portuguese month names.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

use crate::domain::error::DomainError;

pub const PT_BR_MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

// The content API emits offsets without a colon: 2021-03-15T19:25:28+0000
const API_TIMESTAMP: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
);

pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, DomainError> {
    let raw = raw.trim();
    OffsetDateTime::parse(raw, API_TIMESTAMP)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339))
        .map_err(|err| DomainError::validation(format!("invalid timestamp `{raw}`: {err}")))
}

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    let utc = time.to_offset(UtcOffset::UTC);
    let datetime = DateTime::<Utc>::from_timestamp(utc.unix_timestamp(), utc.nanosecond())?;
    Some(tz.from_utc_datetime(&datetime.naive_utc()))
}

pub fn format_pt_br<D: Datelike>(date: &D) -> String {
    let month = PT_BR_MONTHS[date.month0() as usize];
    format!("{:02} {} {}", date.day(), month, date.year())
}

/// Formats a raw publication timestamp in `tz`. Absent or unparsable
/// timestamps yield `None`.
pub fn publication_date(raw: Option<&str>, tz: Tz) -> Option<String> {
    let raw = raw?;
    let parsed = match parse_timestamp(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::debug!(
                target = "spacetraveling::domain::dates",
                error = %err,
                "ignoring unparsable publication date"
            );
            return None;
        }
    };
    localized_datetime(parsed, tz).map(|local| format_pt_br(&local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::{America::Sao_Paulo, UTC};

    #[test]
    fn parses_api_and_rfc3339_timestamps() {
        let api = parse_timestamp("2021-03-15T19:25:28+0000").expect("api timestamp");
        let rfc = parse_timestamp("2021-03-15T19:25:28Z").expect("rfc3339 timestamp");

        assert_eq!(api, rfc);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn formats_with_portuguese_month_names() {
        assert_eq!(
            publication_date(Some("2021-03-15T19:25:28+0000"), UTC).as_deref(),
            Some("15 março 2021")
        );
        assert_eq!(
            publication_date(Some("2021-12-05T10:00:00+0000"), UTC).as_deref(),
            Some("05 dezembro 2021")
        );
    }

    #[test]
    fn localises_to_the_configured_timezone() {
        // 01:00 UTC is still the previous evening in São Paulo.
        assert_eq!(
            publication_date(Some("2021-04-01T01:00:00+0000"), Sao_Paulo).as_deref(),
            Some("31 março 2021")
        );
    }

    #[test]
    fn missing_or_invalid_dates_are_absent() {
        assert_eq!(publication_date(None, UTC), None);
        assert_eq!(publication_date(Some("not a date"), UTC), None);
    }
}
