use chrono::{Duration, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use signalizer::express::{Outcome, expand};
use signalizer::form::team_form;
use signalizer::narrative::parse_narrative;
use signalizer::results_feed::{MatchRow, parse_results_csv};
use signalizer::stakes::allocate_combinations;

const TEAMS: &[&str] = &[
    "Arsenal",
    "Everton",
    "Liverpool",
    "Brentford",
    "Fulham",
    "Wolves",
    "Chelsea",
    "Burnley",
];

const NARRATIVE: &str = "⚽ Arsenal vs Everton\n📅 Date: 18.10 17:00\n📝 Reason: 1:0 or 2:0, maybe 2-1\n\
⚽ Inter vs Lecce\nLikely 2:0, 1:0 or 1:1\n\
⚽ PSV vs Ajax\n3:1 again 3:1, then 2:2\n";

fn season_rows(rng: &mut StdRng, n: usize) -> Vec<MatchRow> {
    let start = Utc.with_ymd_and_hms(2025, 8, 1, 15, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let home = rng.gen_range(0..TEAMS.len());
            let away = (home + rng.gen_range(1..TEAMS.len())) % TEAMS.len();
            MatchRow {
                date: start + Duration::hours(i as i64 * 20),
                home_team: TEAMS[home].to_string(),
                away_team: TEAMS[away].to_string(),
                home_goals: Some(rng.gen_range(0..5)),
                away_goals: Some(rng.gen_range(0..4)),
            }
        })
        .collect()
}

fn results_csv(rows: &[MatchRow]) -> String {
    let mut out = String::from("Div,Date,Time,HomeTeam,AwayTeam,FTHG,FTAG\n");
    for r in rows {
        out.push_str(&format!(
            "E0,{},{},{},{},{},{}\n",
            r.date.format("%d/%m/%Y"),
            r.date.format("%H:%M"),
            r.home_team,
            r.away_team,
            r.home_goals.unwrap_or(0),
            r.away_goals.unwrap_or(0)
        ));
    }
    out
}

fn bench_team_form(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let rows = season_rows(&mut rng, 380);
    c.bench_function("team_form_season", |b| {
        b.iter(|| {
            for team in TEAMS {
                black_box(team_form(black_box(&rows), team));
            }
        })
    });
}

fn bench_results_parse(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let raw = results_csv(&season_rows(&mut rng, 380));
    c.bench_function("results_csv_parse", |b| {
        b.iter(|| {
            let rows = parse_results_csv(black_box(&raw)).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_express_and_stakes(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(23);
    let legs: Vec<Vec<Outcome>> = (0..3)
        .map(|m| {
            (0..3)
                .map(|i| Outcome::new(format!("m{m}o{i}"), rng.gen_range(1.05..6.0)))
                .collect()
        })
        .collect();
    c.bench_function("express_expand_allocate", |b| {
        b.iter(|| {
            let combos = expand(&legs[0], &legs[1], &legs[2]).unwrap();
            let plan = allocate_combinations(black_box(3000.0), &combos).unwrap();
            black_box(plan.guaranteed_payout);
        })
    });
}

fn bench_narrative_parse(c: &mut Criterion) {
    c.bench_function("narrative_parse", |b| {
        b.iter(|| {
            let blocks = parse_narrative(black_box(NARRATIVE));
            black_box(blocks.len());
        })
    });
}

criterion_group!(
    benches,
    bench_team_form,
    bench_results_parse,
    bench_express_and_stakes,
    bench_narrative_parse
);
criterion_main!(benches);
