//! Deterministic churn-shaped sample data.
//!
//! Produces text in the layout of [`Schema::churn`](crate::dataset::Schema::churn)
//! for tests, benchmarks and offline runs. Charges are a fixed rate times the
//! matching minutes, and churn odds rise with customer-service calls and the
//! international plan, so the exploratory and scoring paths see realistic
//! structure.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write;

const STATES: [&str; 8] = ["KS", "OH", "NJ", "OK", "AL", "MA", "MO", "WV"];
const AREA_CODES: [u32; 3] = [408, 415, 510];

const HEADER: &str = "State,Account Length,Area Code,Phone,Int'l Plan,VMail Plan,VMail Message,\
Day Mins,Day Calls,Day Charge,Eve Mins,Eve Calls,Eve Charge,Night Mins,Night Calls,Night Charge,\
Intl Mins,Intl Calls,Intl Charge,CustServ Calls,Churn?";

/// Renders `n_rows` customer rows, header included.
///
/// The first two rows are forced to `False.` and `True.` so any non-empty
/// sample carries both label values.
pub fn churn_csv(n_rows: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::with_capacity(n_rows * 120 + HEADER.len());
    out.push_str(HEADER);
    out.push('\n');

    for row in 0..n_rows {
        let state = STATES[rng.random_range(0..STATES.len())];
        let account_length = rng.random_range(1..=240);
        let area_code = AREA_CODES[rng.random_range(0..AREA_CODES.len())];
        let intl_plan = rng.random_bool(0.1);
        let vmail_plan = rng.random_bool(0.28);
        let vmail_messages = if vmail_plan {
            rng.random_range(5..=50)
        } else {
            0
        };

        let day_mins = round1(rng.random_range(0.0..350.0));
        let eve_mins = round1(rng.random_range(0.0..360.0));
        let night_mins = round1(rng.random_range(20.0..395.0));
        let intl_mins = round1(rng.random_range(0.0..20.0));
        let cust_serv: u32 = rng.random_range(0..=9);

        let mut odds = 0.08 + 0.05 * cust_serv.saturating_sub(3) as f64 + day_mins / 2000.0;
        if intl_plan {
            odds += 0.3;
        }
        let churned = match row {
            0 => false,
            1 => true,
            _ => rng.random_bool(odds.min(0.95)),
        };

        let _ = writeln!(
            out,
            "{},{},{},{}-{:04},{},{},{},{},{},{:.2},{},{},{:.2},{},{},{:.2},{},{},{:.2},{},{}",
            state,
            account_length,
            area_code,
            300 + row % 700,
            row % 10_000,
            yes_no(intl_plan),
            yes_no(vmail_plan),
            vmail_messages,
            day_mins,
            rng.random_range(40..=160),
            day_mins * 0.17,
            eve_mins,
            rng.random_range(40..=170),
            eve_mins * 0.085,
            night_mins,
            rng.random_range(40..=175),
            night_mins * 0.045,
            intl_mins,
            rng.random_range(0..=20),
            intl_mins * 0.27,
            cust_serv,
            if churned { "True." } else { "False." },
        );
    }
    out
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
