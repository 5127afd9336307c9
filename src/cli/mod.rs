use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{
    FixtureAnalysis, League, MatchResult, Probabilities, Session, SimulationMode, SimulationReport, TeamId,
};
use crate::services::{simulate_session, AnalysisOptions, ProbabilityAggregator};
use crate::utils::{format_money, format_percent};

pub async fn analyze(
    aggregator: &ProbabilityAggregator,
    leagues: &[League],
    date: NaiveDate,
    options: &AnalysisOptions,
    details: bool,
    export: Option<&Path>,
) -> Result<()> {
    let session = search(aggregator, leagues, date, options).await;
    if session.is_empty() {
        return Ok(());
    }

    print_fixture_table(session.analyses());
    if details {
        print_details(session.analyses());
    }

    if let Some(path) = export {
        export_csv(path, session.analyses())?;
        println!("\n💾 Exported {} fixtures to {}", session.analyses().len(), path.display());
    }

    Ok(())
}

pub async fn simulate(
    aggregator: &ProbabilityAggregator,
    leagues: &[League],
    date: NaiveDate,
    options: &AnalysisOptions,
    stake: f64,
    bankroll: f64,
    mode: SimulationMode,
) -> Result<()> {
    let session = search(aggregator, leagues, date, options).await;
    if session.is_empty() {
        return Ok(());
    }

    print_fixture_table(session.analyses());

    let report = simulate_session(&session.fixtures(), stake, bankroll, mode)?;
    print_simulation(&report);

    Ok(())
}

pub fn show_leagues() {
    println!("🏆 Supported Leagues:\n");
    for league in League::ALL {
        println!(
            "   • {:<22} api-football {:>4} | football-data {}",
            league.name(),
            league.api_football_id(),
            league.football_data_code()
        );
    }
    println!("\n💡 Use 'matchday analyze --league <league>' with one of:");
    println!("   brasileirao, premier-league, la-liga, serie-a, bundesliga, ligue1");
}

async fn search(
    aggregator: &ProbabilityAggregator,
    leagues: &[League],
    date: NaiveDate,
    options: &AnalysisOptions,
) -> Session {
    let names: Vec<&str> = leagues.iter().map(|l| l.name()).collect();
    println!(
        "🔎 Searching fixtures for {} on {} (provider: {})...",
        names.join(", "),
        date,
        aggregator.provider_name()
    );

    let mut session = Session::default();
    session.replace(aggregator.analyze(leagues, date, options).await);

    if session.is_empty() {
        println!("📭 No fixtures found for that date. Try another date or league.");
    } else {
        println!("✅ Analyzed {} fixtures\n", session.analyses().len());
    }
    session
}

fn print_fixture_table(analyses: &[FixtureAnalysis]) {
    println!(
        "{:<5} {:<34} {:<17} {:<6} {:<19} {:<19} {}",
        "Time", "Match", "Odds H/D/A", "Src", "Base H/D/A", "Final H/D/A", "Pick"
    );
    println!("{}", "─".repeat(110));

    for analysis in analyses {
        let fixture = &analysis.fixture;
        let matchup = format!("{} vs {}", fixture.home.name, fixture.away.name);
        let odds = fixture.odds.as_ref().map_or_else(
            || "-".to_string(),
            |o| format!("{:.2}/{:.2}/{:.2}", o.home, o.draw, o.away),
        );
        let (final_probs, pick) = match &fixture.probabilities {
            Some(p) => (percent_triple(p), p.most_likely().label()),
            None => ("-".to_string(), "-"),
        };

        println!(
            "{:<5} {:<34} {:<17} {:<6} {:<19} {:<19} {}",
            fixture.kickoff.as_deref().unwrap_or("--:--"),
            truncate(&matchup, 34),
            odds,
            format!("{:?}", analysis.base_source).to_lowercase(),
            percent_triple(&analysis.base),
            final_probs,
            pick
        );
    }
}

fn percent_triple(p: &Probabilities) -> String {
    format!(
        "{}/{}/{}",
        format_percent(p.home()),
        format_percent(p.draw()),
        format_percent(p.away())
    )
}

fn match_date(m: &MatchResult) -> String {
    m.kickoff
        .map(|k| k.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string())
}

fn score_text(m: &MatchResult) -> String {
    m.score
        .map(|s| format!("{}-{}", s.home, s.away))
        .unwrap_or_else(|| "?-?".to_string())
}

/// One line of a team's recent games, from that team's side.
fn recent_line(team_id: TeamId, m: &MatchResult) -> String {
    let venue = if m.home.id == team_id { "vs" } else { "at" };
    let opponent = m.opponent_of(team_id).map_or("?", |t| t.name.as_str());
    let result = m.result_for(team_id).map_or('?', |r| r.letter());
    format!(
        "{}  {} {:<24} {:>5}  {}",
        match_date(m),
        venue,
        truncate(opponent, 24),
        score_text(m),
        result
    )
}

fn meeting_line(m: &MatchResult) -> String {
    format!(
        "{}  {:>24} {:^5} {}",
        match_date(m),
        truncate(&m.home.name, 24),
        score_text(m),
        truncate(&m.away.name, 24)
    )
}

fn print_details(analyses: &[FixtureAnalysis]) {
    println!("\n📊 Details:");
    for analysis in analyses {
        let fixture = &analysis.fixture;
        println!("\n{} vs {} ({})", fixture.home.name, fixture.away.name, fixture.league_name);
        for (team, form) in [(&fixture.home, &analysis.home_form), (&fixture.away, &analysis.away_form)] {
            println!(
                "   {:<24} form {:<6} {:.2} ppm over {} games (GF {:.1} / GA {:.1})",
                team.name,
                if form.form.is_empty() { "-" } else { form.form.as_str() },
                form.points_per_match,
                form.games,
                form.goals_for_avg,
                form.goals_against_avg
            );
            for m in &form.matches {
                println!("      {}", recent_line(team.id, m));
            }
        }
        let h2h = &analysis.head_to_head;
        println!(
            "   H2H: {} meetings | {} {} | draws {} | {} {}",
            h2h.meetings, fixture.home.name, h2h.home_wins, h2h.draws, fixture.away.name, h2h.away_wins
        );
        for m in &h2h.matches {
            println!("      {}", meeting_line(m));
        }
        println!(
            "   Components: base {} | form {} | h2h {}",
            percent_triple(&analysis.base),
            percent_triple(&analysis.form),
            percent_triple(&analysis.h2h)
        );
        for note in &analysis.notes {
            println!("   ⚠️  {}", note);
        }
    }
}

fn print_simulation(report: &SimulationReport) {
    println!("\n🎲 Simulation ({:?}, stake {:.2}):\n", report.mode, report.stake);

    for bet in &report.bets {
        let odd = match bet.odd {
            Some(odd) if bet.odd_quoted => format!("{:.2}", odd),
            Some(odd) => format!("{:.2}*", odd),
            None => "-".to_string(),
        };
        let outcome = match bet.won {
            Some(true) => "✅",
            Some(false) => "❌",
            None => "",
        };
        println!(
            "   {:<38} pick {} @ {:<6} p={} {:>8} {}",
            truncate(&format!("{} vs {}", bet.home_team, bet.away_team), 38),
            bet.pick.label(),
            odd,
            format_percent(bet.probability),
            format_money(bet.profit),
            outcome
        );
    }

    if report.skipped > 0 {
        println!("\n   Skipped {} fixtures without probabilities", report.skipped);
    }
    println!("\n💰 Total staked: {:.2}", report.total_staked);
    println!("💰 Total profit: {}", format_money(report.total_profit));
    println!("📈 Return on stake: {}", format_percent(report.return_on_stake));
    println!(
        "🏦 Bankroll: {:.2} → {:.2}",
        report.starting_bankroll, report.final_bankroll
    );

    if report.mode == SimulationMode::Expected {
        println!("\n⚠️  Note: picks without a quoted odd use a (p - 0.5) proxy, not a real expected value.");
    } else {
        println!("\n⚠️  Note: * marks fair odds implied by the model; one random draw per bet.");
    }
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    fixture_id: u64,
    league: &'a str,
    date: NaiveDate,
    kickoff: Option<&'a str>,
    home: &'a str,
    away: &'a str,
    odds_home: Option<f64>,
    odds_draw: Option<f64>,
    odds_away: Option<f64>,
    base_source: String,
    base_home: f64,
    base_draw: f64,
    base_away: f64,
    prob_home: Option<f64>,
    prob_draw: Option<f64>,
    prob_away: Option<f64>,
    pick: Option<&'static str>,
}

fn export_rows(analyses: &[FixtureAnalysis]) -> impl Iterator<Item = ExportRow<'_>> {
    analyses.iter().map(|analysis| {
        let fixture = &analysis.fixture;
        let probs = fixture.probabilities;
        ExportRow {
            fixture_id: fixture.id,
            league: &fixture.league_name,
            date: fixture.date,
            kickoff: fixture.kickoff.as_deref(),
            home: &fixture.home.name,
            away: &fixture.away.name,
            odds_home: fixture.odds.as_ref().map(|o| o.home),
            odds_draw: fixture.odds.as_ref().map(|o| o.draw),
            odds_away: fixture.odds.as_ref().map(|o| o.away),
            base_source: format!("{:?}", analysis.base_source).to_lowercase(),
            base_home: analysis.base.home(),
            base_draw: analysis.base.draw(),
            base_away: analysis.base.away(),
            prob_home: probs.map(|p| p.home()),
            prob_draw: probs.map(|p| p.draw()),
            prob_away: probs.map(|p| p.away()),
            pick: probs.map(|p| p.most_likely().label()),
        }
    })
}

fn export_csv(path: &Path, analyses: &[FixtureAnalysis]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    for row in export_rows(analyses) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
