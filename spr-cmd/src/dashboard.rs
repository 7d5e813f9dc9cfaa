//! Subcommand handlers: build a session, apply flags, load and render.

use crate::backend::{Backend, SourceArgs};
use crate::export::export_to_path;
use crate::filters::{ComparisonArgs, FilterArgs};
use crate::report;
use anyhow::bail;
use chrono::Local;
use log::{info, warn};
use spr_api::model::ReferenceList;
use spr_data::{ComparisonConfig, ComparisonScreen, ComparisonSession, Metric, ToggleOutcome};

pub struct CompareRequest {
    pub schools: Vec<u32>,
    pub screen: ComparisonScreen,
    pub by_gender: bool,
    pub json: bool,
}

async fn open(
    source: &SourceArgs,
    filter: &FilterArgs,
    screen: ComparisonScreen,
    config: ComparisonConfig,
) -> anyhow::Result<(Backend, ComparisonSession)> {
    let backend = Backend::connect(source)?;
    let mut session = ComparisonSession::mount(&backend, screen, config).await;
    for list in session.catalog().failures() {
        warn!("Reference list {} unavailable; related filters are disabled", list);
    }
    filter.apply(&mut session)?;
    Ok((backend, session))
}

/// Human-readable description of the active filter.
pub fn describe(session: &ComparisonSession) -> String {
    let filter = session.filter();
    let catalog = session.catalog();
    let mut parts = Vec::new();
    let region = filter.region();
    for name in [&region.commune, &region.city, &region.province].into_iter().flatten() {
        parts.push(name.clone());
    }
    if let Some(class) = filter.class().and_then(|id| catalog.class(id)) {
        parts.push(class.name.clone());
    }
    if let Some(option) = filter.option().and_then(|id| catalog.option(id)) {
        parts.push(option.name.clone());
    }
    if let Some(gender) = filter.gender() {
        parts.push(gender.label().to_string());
    }
    if parts.is_empty() {
        "Toutes les écoles".to_string()
    } else {
        parts.join(" / ")
    }
}

pub async fn rankings(
    source: &SourceArgs,
    filter: &FilterArgs,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let config = ComparisonConfig::default();
    let (backend, mut session) = open(source, filter, ComparisonScreen::Rankings, config).await?;
    let state = session.refresh(&backend).await;
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }
    if let Some(view) = report::ready(state) {
        report::print_rankings(view, limit);
    }
    Ok(())
}

pub async fn compare(
    source: &SourceArgs,
    filter: &FilterArgs,
    comparison: &ComparisonArgs,
    request: &CompareRequest,
) -> anyhow::Result<()> {
    let (backend, mut session) =
        open(source, filter, request.screen, comparison.config()).await?;

    for id in &request.schools {
        if session.catalog().entity(*id).is_none() {
            warn!("School {} is not in the schools list", id);
        }
        if session.toggle_entity(*id) == ToggleOutcome::Full {
            warn!(
                "Selection is limited to {} schools; ignoring {}",
                session.filter().selection().max(),
                id
            );
        }
    }

    let gender_chart = if request.by_gender {
        session.gender_comparison(&backend, Metric::from(comparison.metric)).await
    } else {
        None
    };
    let state = session.refresh(&backend).await;

    if request.json {
        let body = serde_json::json!({ "view": state, "byGender": gender_chart });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    if let Some(view) = report::ready(state) {
        report::print_comparison(view);
    }
    if let Some(chart) = &gender_chart {
        println!();
        report::print_chart("Garçons / Filles", chart);
    }
    Ok(())
}

pub async fn summary(source: &SourceArgs, filter: &FilterArgs, json: bool) -> anyhow::Result<()> {
    let config = ComparisonConfig::default();
    let (backend, mut session) = open(source, filter, ComparisonScreen::Rankings, config).await?;
    let state = session.refresh(&backend).await;
    match report::ready(state) {
        Some(view) if json => println!("{}", serde_json::to_string_pretty(&view.summary)?),
        Some(view) => report::print_summary(view),
        None => {}
    }
    Ok(())
}

pub async fn export(source: &SourceArgs, filter: &FilterArgs, output: &str) -> anyhow::Result<()> {
    let config = ComparisonConfig::default();
    let (backend, mut session) = open(source, filter, ComparisonScreen::Rankings, config).await?;
    let description = describe(&session);
    let state = session.refresh(&backend).await;
    let Some(view) = report::ready(state) else {
        bail!("Nothing to export for {}", description);
    };
    export_to_path(output, view, &description, Local::now().date_naive())?;
    info!("Export complete. Output: {}", output);
    Ok(())
}

pub async fn suggest(source: &SourceArgs, prompt: &str) -> anyhow::Result<()> {
    let config = ComparisonConfig::default();
    let (backend, mut session) =
        open(source, &FilterArgs::default(), ComparisonScreen::Rankings, config).await?;
    match session.suggest(&backend, prompt).await {
        Some(resolved) if !resolved.is_empty() => println!("Filtres: {}", describe(&session)),
        _ => println!("Aucun filtre reconnu; affichage de toutes les écoles."),
    }
    let state = session.refresh(&backend).await;
    if let Some(view) = report::ready(state) {
        report::print_rankings(view, None);
    }
    Ok(())
}

pub async fn schools(source: &SourceArgs, search: &str) -> anyhow::Result<()> {
    let backend = Backend::connect(source)?;
    let session =
        ComparisonSession::mount(&backend, ComparisonScreen::Rankings, Default::default()).await;
    if !session.catalog().is_available(ReferenceList::Schools) {
        bail!("The schools list could not be loaded");
    }
    for entity in session.catalog().search_entities(search) {
        println!("{:>5}  {:<10} {:<32} {}", entity.id, entity.code, entity.name, entity.region);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spr_api::memory::MemoryService;
    use spr_data::RegionLevel;

    #[tokio::test]
    async fn describe_lists_active_filters() {
        let service =
            MemoryService::from_json(include_str!("../../fixtures/lualaba-katanga.json")).unwrap();
        let mut session =
            ComparisonSession::mount(&service, ComparisonScreen::Rankings, Default::default())
                .await;
        assert_eq!(describe(&session), "Toutes les écoles");

        session.set_region(RegionLevel::Province, Some("Lualaba")).unwrap();
        session.set_region(RegionLevel::City, Some("Kolwezi")).unwrap();
        session.set_gender(Some(spr_api::model::Gender::Female));
        assert_eq!(describe(&session), "Kolwezi / Lualaba / Filles");
    }
}
