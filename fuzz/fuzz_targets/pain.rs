#![no_main]
use libfuzzer_sys::fuzz_target;
use nync_libs::pain::{score, PainTier};

fuzz_target!(|data: (u32, bool)| {
    let (hour, blocked) = data;
    let points = score(hour, blocked);

    assert!(
        PainTier::ALL.iter().any(|tier| tier.points() == points),
        "{} is not a tier value",
        points
    );
    assert_eq!(points, score(hour, blocked), "Scoring must be deterministic");

    if blocked {
        assert_eq!(points, PainTier::Conflict.points());
    } else {
        assert!(points < PainTier::Conflict.points());
    }
});
