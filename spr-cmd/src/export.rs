//! CSV export of a ranking view.
//!
//! Layout: a metadata block (generation date, year, filter and summary),
//! then the ranking table with its own header row.

use chrono::NaiveDate;
use log::info;
use spr_data::aggregate::SummarySource;
use spr_data::DashboardView;
use std::io::Write;

pub fn write_csv<W: Write>(
    writer: W,
    view: &DashboardView,
    filter: &str,
    generated: NaiveDate,
) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    let summary = &view.summary.summary;
    let source = match view.summary.source {
        SummarySource::Remote => "remote",
        SummarySource::Recomputed => "recomputed",
    };
    let metadata = [
        ("generated", generated.format("%Y-%m-%d").to_string()),
        ("year", view.year.label.clone()),
        ("filter", filter.to_string()),
        ("schools", summary.entity_count.to_string()),
        ("students", summary.population_count.to_string()),
        ("overall_average", format!("{:.2}", summary.overall_average)),
        ("overall_success_rate", format!("{:.2}", summary.overall_success_rate)),
        ("summary_source", source.to_string()),
    ];
    for (key, value) in &metadata {
        wtr.write_record([*key, value.as_str()])?;
    }

    wtr.write_record([
        "rank",
        "name",
        "region",
        "average",
        "success_rate",
        "principal_option",
    ])?;
    for row in &view.rows {
        wtr.write_record([
            row.rank.to_string(),
            row.name.clone(),
            row.region.clone(),
            format!("{:.2}", row.average),
            format!("{:.2}", row.success_rate),
            row.principal_category.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_to_path(
    path: &str,
    view: &DashboardView,
    filter: &str,
    generated: NaiveDate,
) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(file, view, filter, generated)?;
    info!("Exported {} rows to {}", view.rows.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spr_api::model::{AggregateSummary, SchoolYear};
    use spr_data::aggregate::SurfacedSummary;
    use spr_data::presentation::{ChartData, RankTier, RankingRow};

    fn view() -> DashboardView {
        DashboardView {
            year: SchoolYear {
                id: 6,
                label: "2024-2025".into(),
            },
            rows: vec![RankingRow {
                rank: 1,
                entity_id: 4,
                name: "Lycée Mwangeji".into(),
                region: "Manika, Kolwezi".into(),
                average: 71.5,
                success_rate: 89.5,
                principal_category: "Biochimie".into(),
                tier: RankTier::Podium,
            }],
            summary: SurfacedSummary {
                summary: AggregateSummary {
                    overall_average: 71.5,
                    overall_success_rate: 89.5,
                    entity_count: 1,
                    population_count: 180,
                },
                source: SummarySource::Recomputed,
            },
            comparison: ChartData::default(),
            trends: Vec::new(),
            trend_chart: ChartData::default(),
            relative: None,
        }
    }

    #[test]
    fn csv_has_metadata_then_table() {
        let mut out = Vec::new();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        write_csv(&mut out, &view(), "Kolwezi", date).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "generated,2025-03-14");
        assert_eq!(lines[1], "year,2024-2025");
        assert!(lines.contains(&"summary_source,recomputed"));
        assert_eq!(
            lines[lines.len() - 1],
            "1,Lycée Mwangeji,\"Manika, Kolwezi\",71.50,89.50,Biochimie"
        );
    }
}
