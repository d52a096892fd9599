use crate::analysis::Scenario;
use crate::config::AnalysisOptions;
use crate::roster::RosterMember;
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;

const ICS_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Escapes a TEXT value for an iCalendar property.
fn escape_text(text: &str) -> String {
    text.chars()
        .fold(String::with_capacity(text.len()), |mut out, c| {
            match c {
                '\\' => out.push_str("\\\\"),
                ';' => out.push_str("\\;"),
                ',' => out.push_str("\\,"),
                '\n' => out.push_str("\\n"),
                '\r' => {}
                _ => out.push(c),
            }
            out
        })
}

/// Renders a one-event iCalendar invite for the chosen scenario.
///
/// `stamp` is the creation time written to `DTSTAMP`. The meeting length and
/// title come from `options`.
///
/// # Examples
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use nync_libs::analysis::{analyze, day_start, HistoryMap};
/// use nync_libs::busy::BusyMap;
/// use nync_libs::config::AnalysisOptions;
/// use nync_libs::invite::render_ics;
/// use nync_libs::roster::RosterMember;
///
/// let roster = vec![RosterMember::user("ada", "Ada", "UTC")];
/// let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
/// let best = analyze(&roster, &BusyMap::new(), day_start(date), &HistoryMap::new()).remove(0);
/// let stamp = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
///
/// let ics = render_ics(&best, &roster, &AnalysisOptions::default(), stamp);
///
/// assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
/// assert!(ics.contains("DTSTART:20240603T090000Z\r\n"));
/// assert!(ics.contains("DTEND:20240603T100000Z\r\n"));
/// ```
pub fn render_ics(
    scenario: &Scenario,
    roster: &[RosterMember],
    options: &AnalysisOptions,
    stamp: DateTime<Utc>,
) -> String {
    let start = scenario.start;
    let end = start + Duration::minutes(i64::from(options.meeting_minutes));

    let dt_stamp = stamp.format(ICS_TIME_FORMAT).to_string();
    let dt_start = start.format(ICS_TIME_FORMAT).to_string();

    let description = roster
        .iter()
        .map(|member| {
            let pain = scenario
                .breakdown
                .get(&member.id)
                .map_or(0, |entry| entry.pain);
            format!(
                "- {} ({}): +{} pain",
                member.display_name, member.timezone, pain
            )
        })
        .join("\n");

    [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Nync//Fair Scheduler//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:REQUEST".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}-{}@nync", dt_stamp, dt_start),
        format!("DTSTAMP:{}", dt_stamp),
        format!("DTSTART:{}", dt_start),
        format!("DTEND:{}", end.format(ICS_TIME_FORMAT)),
        format!("SUMMARY:{}", escape_text(&options.calendar_title)),
        format!(
            "DESCRIPTION:{}",
            escape_text(&format!("Pain Report:\n{}", description))
        ),
        "STATUS:CONFIRMED".to_string(),
        "SEQUENCE:0".to_string(),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ]
    .iter()
    .map(|line| format!("{}\r\n", line))
    .collect()
}

/// Plain-text summary of who pays for the chosen slot.
pub fn pain_report(scenario: &Scenario, options: &AnalysisOptions) -> String {
    let mut report = format!(
        "{}\n{} UTC, {} minutes\n\nPain Report:\n",
        options.calendar_title,
        scenario.start.format("%Y-%m-%d %H:%M"),
        options.meeting_minutes
    );

    for member in scenario.breakdown.values() {
        let note = if member.blocked { " (calendar conflict)" } else { "" };
        report.push_str(&format!(
            "- {} at {:02}:00: +{} pain{}\n",
            member.name, member.local_hour, member.pain, note
        ));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::analysis::HistoryMap;
    use crate::busy::{BusyHours, BusyMap};
    use chrono::TimeZone;

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    }

    #[test]
    fn invite_lists_every_member() {
        let roster = vec![
            RosterMember::user("ada", "Ada", "Europe/London"),
            RosterMember::placeholder("lin", "Lin, Jr.", "Asia/Shanghai"),
        ];
        let busy = BusyMap::new();
        let history = HistoryMap::new();
        let scenario = Analyzer::new(&roster, &busy, &history).scenario(day(), 15);
        let options = AnalysisOptions {
            meeting_minutes: 90,
            calendar_title: "Planning".to_string(),
            ..AnalysisOptions::default()
        };

        let ics = render_ics(&scenario, &roster, &options, day());

        assert!(ics.contains("DTSTART:20240603T150000Z\r\n"));
        assert!(ics.contains("DTEND:20240603T163000Z\r\n"));
        assert!(ics.contains("SUMMARY:Planning\r\n"));
        assert!(ics.contains("- Ada (Europe/London): +0 pain"));
        assert!(ics.contains("- Lin\\, Jr. (Asia/Shanghai): +10 pain"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert_eq!(ics.matches("\r\n").count(), 16);
    }

    #[test]
    fn report_flags_conflicts() {
        let roster = vec![
            RosterMember::user("ada", "Ada", "UTC"),
            RosterMember::user("bo", "Bo", "UTC"),
        ];
        let mut busy = BusyMap::new();
        busy.insert(
            "bo".to_string(),
            vec![day() + Duration::hours(10)].into_iter().collect::<BusyHours>(),
        );
        let history = HistoryMap::new();
        let scenario = Analyzer::new(&roster, &busy, &history).scenario(day(), 10);

        let report = pain_report(&scenario, &AnalysisOptions::default());

        assert!(report.starts_with("Team Sync\n2024-06-03 10:00 UTC, 60 minutes\n"));
        assert!(report.contains("- Ada at 10:00: +0 pain\n"));
        assert!(report.contains("- Bo at 10:00: +100 pain (calendar conflict)\n"));
    }
}
