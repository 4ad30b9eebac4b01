use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use signalizer::config::ScanConfig;
use signalizer::express::{DEFAULT_OUTCOME_ODDS, Outcome, expand};
use signalizer::history::{HistoryItem, append_history};
use signalizer::logging;
use signalizer::narrative::parse_express_outcomes;
use signalizer::signals::read_signals_csv;
use signalizer::stakes::{allocate_combinations, fixed_stake, kelly};

const DEFAULT_BUDGET: f64 = 3000.0;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    if let Some(raw) = arg_value("--kelly") {
        return run_kelly(&raw);
    }

    let cfg = ScanConfig::from_env();
    let signals_path = arg_value("--signals")
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.signals_path.clone());
    let signals = read_signals_csv(&signals_path)?;
    if signals.len() < 3 {
        println!(
            "Need 3 signals for an express, found {} in {}",
            signals.len(),
            signals_path.display()
        );
        return Ok(());
    }
    let top: Vec<String> = signals.iter().take(3).map(|s| s.match_label()).collect();

    let narrative_path = arg_value("--narrative")
        .map(PathBuf::from)
        .context("--narrative <file> is required")?;
    let narrative = fs::read_to_string(&narrative_path)
        .with_context(|| format!("read narrative {}", narrative_path.display()))?;
    let parsed = parse_express_outcomes(&narrative)?;

    let prices = match arg_value("--odds") {
        Some(raw) => parse_odds_list(&raw)?,
        None => vec![DEFAULT_OUTCOME_ODDS; 9],
    };
    let legs: Vec<Vec<Outcome>> = parsed
        .iter()
        .zip(prices.chunks(3))
        .map(|(p, odds)| {
            p.labels
                .iter()
                .zip(odds)
                .map(|(label, o)| Outcome::new(label.clone(), *o))
                .collect()
        })
        .collect();
    let combos = expand(&legs[0], &legs[1], &legs[2])?;

    println!("Express");
    for (idx, (name, p)) in top.iter().zip(parsed.iter()).enumerate() {
        println!(
            "{}. {} | {} | {}",
            idx + 1,
            name,
            p.date.as_deref().unwrap_or("-"),
            p.labels.join(" / ")
        );
        if let Some(reason) = p.reason.as_deref() {
            println!("   {reason}");
        }
    }

    let odds: Vec<f64> = combos.iter().map(|c| c.combined_odds).collect();
    let roi_calculation = match arg_value("--fixed-stake") {
        Some(raw) => {
            let stake = raw
                .parse::<f64>()
                .with_context(|| format!("invalid --fixed-stake {raw}"))?;
            let report = fixed_stake(stake, &odds)?;
            for (idx, (combo, payout)) in combos.iter().zip(&report.payouts).enumerate() {
                println!(
                    "{:>2}. {:<48} x{:>7.2}  stake {:>8.2}  payout {:>9.2}",
                    idx + 1,
                    combo.describe(),
                    combo.combined_odds,
                    report.stake,
                    payout
                );
            }
            println!("Total cost: {:.2}", report.total_cost);
            println!(
                "Min payout: {:.2} (profit {:.2})",
                report.min_payout, report.min_profit
            );
            println!(
                "Max payout: {:.2} (profit {:.2})",
                report.max_payout, report.max_profit
            );
            format!("Profit: {:.0}..{:.0}", report.min_profit, report.max_profit)
        }
        None => {
            let budget = match arg_value("--budget") {
                Some(raw) => raw
                    .parse::<f64>()
                    .with_context(|| format!("invalid --budget {raw}"))?,
                None => DEFAULT_BUDGET,
            };
            let plan = allocate_combinations(budget, &combos)?;
            for (idx, (combo, stake)) in combos.iter().zip(&plan.stakes).enumerate() {
                println!(
                    "{:>2}. {:<48} x{:>7.2}  stake {:>8.2}",
                    idx + 1,
                    combo.describe(),
                    combo.combined_odds,
                    stake
                );
            }
            println!("Guaranteed payout: {:.2}", plan.guaranteed_payout);
            println!("Net profit: {:.2}", plan.net_profit);
            println!("ROI: {:.2}%", plan.roi * 100.0);
            format!("{:.2}%", plan.roi * 100.0)
        }
    };

    let now = Utc::now();
    let keys = ["m1", "m2", "m3"];
    let item = HistoryItem {
        date: now.format("%Y-%m-%d").to_string(),
        matches: top,
        outcomes: keys
            .iter()
            .zip(parsed.iter())
            .map(|(k, p)| (k.to_string(), p.labels.clone()))
            .collect::<BTreeMap<_, _>>(),
        odds: keys
            .iter()
            .zip(prices.chunks(3))
            .map(|(k, o)| (k.to_string(), o.to_vec()))
            .collect::<BTreeMap<_, _>>(),
        variations_count: combos.len(),
        roi_calculation,
        timestamp: now.timestamp() as f64,
    };
    let count = append_history(&cfg.history_path, &item)?;
    println!(
        "History: {} entries in {}",
        count,
        cfg.history_path.display()
    );
    Ok(())
}

fn run_kelly(raw: &str) -> Result<()> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .context("--kelly expects ODDS,PROB,BANKROLL")?;
    let [odds, prob, bankroll] = parts[..] else {
        return Err(anyhow!("--kelly expects ODDS,PROB,BANKROLL"));
    };
    let advice = kelly(bankroll, odds, prob);
    if advice.should_bet() {
        println!(
            "Bet {:.2} ({:.2}% of bankroll)",
            advice.amount,
            advice.fraction * 100.0
        );
    } else {
        println!("Do not bet");
    }
    Ok(())
}

/// Nine comma-separated prices, three per match in outcome order.
fn parse_odds_list(raw: &str) -> Result<Vec<f64>> {
    let odds = raw
        .split([',', ';', ' '])
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid --odds {raw}"))?;
    if odds.len() != 9 {
        return Err(anyhow!("--odds needs 9 prices, got {}", odds.len()));
    }
    Ok(odds)
}

fn arg_value(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix)
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
