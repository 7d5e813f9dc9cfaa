//! Plain-text rendering of dashboard views.

use spr_data::aggregate::{SummarySource, SurfacedSummary};
use spr_data::presentation::{ChartData, RankTier, RankingRow, RelativePosition};
use spr_data::{DashboardView, ViewState};

fn value(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

fn signed(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:+.2}", v),
        None => "-".to_string(),
    }
}

pub fn ranking_lines(rows: &[RankingRow], limit: Option<usize>) -> Vec<String> {
    let mut lines = vec![format!(
        "{:>4}  {:<32} {:<24} {:>8} {:>8}  {}",
        "Rang", "École", "Région", "Moyenne", "Réussite", "Option principale"
    )];
    for row in rows.iter().take(limit.unwrap_or(usize::MAX)) {
        let marker = match row.tier {
            RankTier::Podium => "*",
            RankTier::Standard => " ",
        };
        lines.push(format!(
            "{:>3}{}  {:<32} {:<24} {:>8.2} {:>7.1}%  {}",
            row.rank,
            marker,
            row.name,
            row.region,
            row.average,
            row.success_rate,
            row.principal_category
        ));
    }
    lines
}

pub fn summary_lines(summary: &SurfacedSummary) -> Vec<String> {
    let source = match summary.source {
        SummarySource::Remote => "statistiques globales",
        SummarySource::Recomputed => "recalculé sur la sélection",
    };
    let s = &summary.summary;
    vec![
        format!("Écoles:           {}", s.entity_count),
        format!("Élèves:           {}", s.population_count),
        format!("Moyenne générale: {:.2}", s.overall_average),
        format!("Taux de réussite: {:.1}%", s.overall_success_rate),
        format!("Source:           {}", source),
    ]
}

pub fn chart_lines(title: &str, chart: &ChartData) -> Vec<String> {
    let mut lines = vec![format!("{}:", title)];
    let width = chart.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0).max(8);
    let header: Vec<String> = chart
        .labels
        .iter()
        .map(|l| format!("{:>width$}", l, width = width))
        .collect();
    lines.push(format!("  {:<24} {}", "", header.join(" ")));
    for dataset in &chart.datasets {
        let cells: Vec<String> = dataset
            .data
            .iter()
            .map(|v| format!("{:>width$}", value(*v), width = width))
            .collect();
        lines.push(format!("  {:<24} {}", dataset.label, cells.join(" ")));
    }
    lines
}

pub fn relative_lines(position: &RelativePosition) -> Vec<String> {
    vec![
        format!(
            "Moyenne:  {:.2} (pairs {}, écart {})",
            position.average.value,
            value(position.average.peers_mean),
            signed(position.average.delta)
        ),
        format!(
            "Réussite: {:.1}% (pairs {}, écart {})",
            position.success_rate.value,
            value(position.success_rate.peers_mean),
            signed(position.success_rate.delta)
        ),
        format!(
            "Rang:     {} (pairs {}, écart {})",
            position.rank.value,
            value(position.rank.peers_mean),
            signed(position.rank.delta)
        ),
    ]
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

/// Print the ready view, or a one-line state message. Returns the view if ready.
pub fn ready(state: &ViewState) -> Option<&DashboardView> {
    match state {
        ViewState::Ready(view) => Some(view.as_ref()),
        ViewState::Empty => {
            println!("Aucune donnée pour ces filtres.");
            None
        }
        ViewState::Loading => {
            println!("Chargement...");
            None
        }
        ViewState::Error(message) => {
            println!("Erreur: {}", message);
            None
        }
    }
}

pub fn print_rankings(view: &DashboardView, limit: Option<usize>) {
    println!("Classement {}", view.year.label);
    print_lines(ranking_lines(&view.rows, limit));
}

pub fn print_summary(view: &DashboardView) {
    println!("Résumé {}", view.year.label);
    print_lines(summary_lines(&view.summary));
}

pub fn print_comparison(view: &DashboardView) {
    print_lines(chart_lines("Comparaison", &view.comparison));
    println!();
    print_lines(chart_lines("Évolution", &view.trend_chart));
    if let Some(position) = &view.relative {
        println!();
        println!("Position relative:");
        print_lines(relative_lines(position));
    }
}

pub fn print_chart(title: &str, chart: &ChartData) {
    print_lines(chart_lines(title, chart));
}
