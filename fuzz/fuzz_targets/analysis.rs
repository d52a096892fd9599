#![no_main]
use chrono::{Duration, NaiveDate};
use libfuzzer_sys::fuzz_target;
use nync_libs::{
    analysis::{day_start, Analyzer, HistoryMap},
    busy::BusyMap,
    roster::RosterMember,
};

fuzz_target!(|data: (Vec<RosterMember>, Vec<(u8, u8)>, Vec<(u8, u16)>, u16)| {
    #[cfg(feature = "log")]
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply();

    let (mut roster, busy_slots, balances, offset) = data;
    roster.truncate(64);
    roster.sort_by(|a, b| a.id.cmp(&b.id));
    roster.dedup_by(|a, b| a.id == b.id);

    let date = match NaiveDate::from_ymd_opt(2020, 1, 1) {
        Some(date) => date + Duration::days(i64::from(offset)),
        None => return,
    };
    let day = day_start(date);

    let mut busy = BusyMap::new();
    let mut history = HistoryMap::new();
    if !roster.is_empty() {
        for (member, hour) in busy_slots {
            let id = roster[member as usize % roster.len()].id.clone();
            busy.entry(id)
                .or_default()
                .insert(day + Duration::hours(i64::from(hour % 24)));
        }
        for (member, balance) in balances {
            let id = roster[member as usize % roster.len()].id.clone();
            history.insert(id, u32::from(balance));
        }
    }

    let ranked = Analyzer::new(&roster, &busy, &history)
        .with_limit(0)
        .rank(day);

    assert_eq!(ranked.len(), 24, "Every hour must be evaluated");
    assert!(
        ranked
            .iter()
            .zip(ranked.iter().skip(1))
            .all(|(l, r)| l.rank_key() <= r.rank_key()),
        "Scenarios are out of order"
    );

    for scenario in ranked.iter() {
        assert_eq!(scenario.breakdown.len(), roster.len());
        assert_eq!(
            scenario.total_pain,
            scenario.breakdown.values().map(|m| m.pain).sum::<u32>()
        );
        assert_eq!(
            scenario.has_conflict,
            scenario.breakdown.values().any(|m| m.blocked)
        );
        if roster.len() < 2 {
            assert_eq!(scenario.gap, 0);
        }
    }
});
