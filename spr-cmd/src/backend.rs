//! Where results come from: the HTTP service or a JSON fixture.

use anyhow::Context;
use clap::Args;
use log::info;
use spr_api::client::{ClientConfig, HttpService, DEFAULT_BASE_URL};
use spr_api::memory::MemoryService;
use spr_api::model::{
    AggregateSummary, ClassLevel, FilterSuggestion, RankingSnapshot, SchoolRecord, SchoolYear,
    StudyOption, YearId,
};
use spr_api::{ResultsService, SnapshotQuery};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// Base URL of the results service
    #[arg(long, env = "SPR_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Read results from a JSON fixture instead of the service
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

pub enum Backend {
    Http(HttpService),
    Memory(MemoryService),
}

impl Backend {
    pub fn connect(args: &SourceArgs) -> anyhow::Result<Self> {
        match &args.fixture {
            Some(path) => {
                info!("Using fixture {}", path.display());
                let service = MemoryService::from_path(path)
                    .with_context(|| format!("Failed to load fixture {}", path.display()))?;
                Ok(Backend::Memory(service))
            }
            None => {
                info!("Using results service at {}", args.base_url);
                let config = ClientConfig {
                    base_url: args.base_url.clone(),
                    timeout: Duration::from_secs(args.timeout_secs),
                    ..Default::default()
                };
                Ok(Backend::Http(HttpService::new(config)?))
            }
        }
    }
}

impl ResultsService for Backend {
    async fn school_rankings(&self, query: SnapshotQuery) -> spr_api::Result<Vec<RankingSnapshot>> {
        match self {
            Backend::Http(s) => s.school_rankings(query).await,
            Backend::Memory(s) => s.school_rankings(query).await,
        }
    }

    async fn global_stats(&self, year: YearId) -> spr_api::Result<AggregateSummary> {
        match self {
            Backend::Http(s) => s.global_stats(year).await,
            Backend::Memory(s) => s.global_stats(year).await,
        }
    }

    async fn years(&self) -> spr_api::Result<Vec<SchoolYear>> {
        match self {
            Backend::Http(s) => s.years().await,
            Backend::Memory(s) => s.years().await,
        }
    }

    async fn classes(&self) -> spr_api::Result<Vec<ClassLevel>> {
        match self {
            Backend::Http(s) => s.classes().await,
            Backend::Memory(s) => s.classes().await,
        }
    }

    async fn options(&self) -> spr_api::Result<Vec<StudyOption>> {
        match self {
            Backend::Http(s) => s.options().await,
            Backend::Memory(s) => s.options().await,
        }
    }

    async fn schools(&self) -> spr_api::Result<Vec<SchoolRecord>> {
        match self {
            Backend::Http(s) => s.schools().await,
            Backend::Memory(s) => s.schools().await,
        }
    }

    async fn suggest_filters(&self, prompt: String) -> spr_api::Result<FilterSuggestion> {
        match self {
            Backend::Http(s) => s.suggest_filters(prompt).await,
            Backend::Memory(s) => s.suggest_filters(prompt).await,
        }
    }
}
