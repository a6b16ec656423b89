//! Router — the coordination surface (spec §4.9).
//!
//! Owns every tier, the relationship engine, the search engine and the
//! event bus; classifies new items into a target tier, merges and re-scores
//! cross-tier search results, and drives promotion/migration/optimization.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use serde::Serialize;

use crate::config::{RouterConfig, StratumConfig};
use crate::error::{MemoryError, Result};
use crate::events::{EventBus, RouterEvent};
use crate::layers::{GlobalLayer, GraphLayer, InMemoryGraphLayer, MemoryLayer, ProjectLayer, SessionLayer, TemporalLayer};
use crate::middleware::{AllowAllGuard, GuardDecision, Operation, RequestContext, RequestGuard};
use crate::model::{MemoryFilters, MemoryItem, MemoryMetadata, MemoryQuery, MemorySearchResult, NewMemoryItem, Tier};
use crate::relationship::RelationshipEngine;
use crate::search::AdvancedSearchEngine;

/// Tags that route a new item to Global regardless of priority (§4.9 rule 2).
const GLOBAL_TAGS: [&str; 2] = ["important", "reference"];
/// Tags that route a new item to Session regardless of other signals (§4.9 rule 2).
const SESSION_TAGS: [&str; 2] = ["temporary", "session"];
const PROMOTE_TAGS: [&str; 2] = ["promote", "important"];
const LARGE_CONTENT_BYTES: usize = 5000;
const PRIORITY_GLOBAL_THRESHOLD: u8 = 8;
const PRIORITY_PROJECT_THRESHOLD: u8 = 6;

#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub content: String,
    pub metadata: MemoryMetadata,
    /// Rule 1: caller may pin the target tier explicitly.
    pub requested_tier: Option<Tier>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOutcome {
    pub item: MemoryItem,
    pub tier: Tier,
}

/// Identifies a single tier instance; `Project` carries the project id since
/// that tier is keyed per-project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TierTarget {
    Session,
    Project(String),
    Global,
    Temporal,
}

impl TierTarget {
    pub fn tier(&self) -> Tier {
        match self {
            TierTarget::Session => Tier::Session,
            TierTarget::Project(_) => Tier::Project,
            TierTarget::Global => Tier::Global,
            TierTarget::Temporal => Tier::Temporal,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub moved: usize,
    pub duplicated: usize,
}

pub struct Router {
    session: RwLock<SessionLayer>,
    projects: RwLock<HashMap<String, ProjectLayer>>,
    global: RwLock<GlobalLayer>,
    temporal: RwLock<TemporalLayer>,
    graph: RwLock<Box<dyn GraphLayer>>,
    relationships: Mutex<RelationshipEngine>,
    search_engine: Mutex<AdvancedSearchEngine>,
    config: StratumConfig,
    events: EventBus,
    guard: Arc<dyn RequestGuard>,
    data_dir: PathBuf,
}

impl Router {
    pub fn new(config: StratumConfig) -> Self {
        let data_dir = config.data_dir.clone();
        Self {
            session: RwLock::new(SessionLayer::new(config.session.clone())),
            projects: RwLock::new(HashMap::new()),
            global: RwLock::new(GlobalLayer::new(data_dir.clone(), config.global.clone())),
            temporal: RwLock::new(TemporalLayer::new(data_dir.clone(), config.temporal.clone())),
            graph: RwLock::new(Box::new(InMemoryGraphLayer::new())),
            relationships: Mutex::new(RelationshipEngine::new(config.relationships.clone())),
            search_engine: Mutex::new(AdvancedSearchEngine::new()),
            config,
            events: EventBus::new(),
            guard: Arc::new(AllowAllGuard),
            data_dir,
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_guard(mut self, guard: Arc<dyn RequestGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config.router
    }

    fn check(&self, op: Operation, ctx: &RequestContext, payload: &serde_json::Value) -> Result<()> {
        match self.guard.check_request(op, ctx, payload) {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Deny { retry_after_ms } => Err(MemoryError::RateLimited { retry_after_ms }),
        }
    }

    fn project_id_of(metadata: &MemoryMetadata) -> String {
        metadata.project_id.clone().unwrap_or_else(|| "default".to_string())
    }

    fn ensure_project(&self, project_id: &str) {
        let mut projects = self.projects.write().unwrap();
        projects.entry(project_id.to_string()).or_insert_with(|| {
            ProjectLayer::new(
                project_id.to_string(),
                self.data_dir.clone(),
                self.config.project.clone(),
            )
        });
    }

    /// First matching rule wins (§4.9 "Routing (store)").
    fn classify(&self, req: &StoreRequest) -> Tier {
        if let Some(tier) = req.requested_tier {
            return tier;
        }
        if req.metadata.has_any_tag(&GLOBAL_TAGS) {
            return Tier::Global;
        }
        if req.metadata.has_any_tag(&SESSION_TAGS) {
            return Tier::Session;
        }
        if req.metadata.category == "system" || req.metadata.category == "configuration" {
            return Tier::Global;
        }
        if req.metadata.category == "project-specific" {
            return Tier::Project;
        }
        if req.metadata.priority >= PRIORITY_GLOBAL_THRESHOLD {
            return Tier::Global;
        }
        if req.metadata.priority >= PRIORITY_PROJECT_THRESHOLD {
            return Tier::Project;
        }
        if req.content.len() > LARGE_CONTENT_BYTES {
            return Tier::Project;
        }
        Tier::Session
    }

    pub fn store(&self, req: StoreRequest, ctx: &RequestContext) -> Result<StoreOutcome> {
        self.check(Operation::Store, ctx, &serde_json::json!({"content": req.content}))?;
        let tier = self.classify(&req);
        let new = NewMemoryItem {
            id: req.id.clone(),
            content: req.content.clone(),
            metadata: req.metadata.clone(),
        };

        let item = match tier {
            Tier::Session => self.session.write().unwrap().store(new)?,
            Tier::Project => {
                let project_id = Self::project_id_of(&req.metadata);
                self.ensure_project(&project_id);
                let mut projects = self.projects.write().unwrap();
                projects.get_mut(&project_id).unwrap().store(new)?
            }
            Tier::Global => self.global.write().unwrap().store(new)?,
            Tier::Temporal => self.temporal.write().unwrap().store(new)?,
        };

        self.events.emit(RouterEvent::Stored {
            item_id: item.id.clone(),
            tier,
            at: Utc::now(),
        });

        self.detect_relationships_for(&item);
        self.consider_promotion(&item, tier);

        Ok(StoreOutcome { item, tier })
    }

    fn bounded_candidates(&self, exclude_id: &str) -> Vec<MemoryItem> {
        let batch_size = self.config.relationships.batch_size;
        let mut candidates = Vec::new();
        candidates.extend(self.session.read().unwrap().export());
        candidates.extend(self.global.read().unwrap().export());
        candidates.extend(self.temporal.read().unwrap().export());
        for project in self.projects.read().unwrap().values() {
            candidates.extend(project.export());
        }
        candidates.retain(|item| item.id != exclude_id);
        candidates.truncate(batch_size);
        candidates
    }

    fn detect_relationships_for(&self, item: &MemoryItem) {
        self.graph.write().unwrap().create_node(&item.id);

        if !self.config.relationships.enabled {
            return;
        }
        let candidates = self.bounded_candidates(&item.id);
        let new_vector = crate::vector::embed(&item.content, crate::vector::DEFAULT_DIMENSIONS);
        let candidate_vectors: Vec<Vec<f32>> = candidates
            .iter()
            .map(|c| crate::vector::embed(&c.content, crate::vector::DEFAULT_DIMENSIONS))
            .collect();
        let bounded: Vec<(&MemoryItem, Option<&[f32]>)> = candidates
            .iter()
            .zip(candidate_vectors.iter())
            .map(|(c, v)| (c, Some(v.as_slice())))
            .collect();

        let mut relationships = self.relationships.lock().unwrap();
        relationships.detect(item, Some(&new_vector), &bounded);
        drop(relationships);

        self.autolink_against(item, &new_vector, &candidates, &candidate_vectors);
    }

    /// Creates graph edges from `item` to each bounded candidate via the
    /// same temporal/semantic/context signals `RelationshipEngine::detect`
    /// uses (§4.6 "autolink heuristic that creates edges on store").
    fn autolink_against(&self, item: &MemoryItem, item_vector: &[f32], candidates: &[MemoryItem], candidate_vectors: &[Vec<f32>]) {
        let mut graph = self.graph.write().unwrap();
        for (candidate, candidate_vector) in candidates.iter().zip(candidate_vectors.iter()) {
            let temporal_strength = crate::relationship::detection::temporal_strength(item.created_at, candidate.created_at).unwrap_or(0.0);
            let shares_context = crate::relationship::detection::context_strength(item, candidate).is_some();
            graph.autolink(&item.id, &candidate.id, temporal_strength, Some((item_vector, candidate_vector)), shares_context);
        }
    }

    fn consider_promotion(&self, item: &MemoryItem, tier: Tier) {
        if item.metadata.priority >= PRIORITY_GLOBAL_THRESHOLD && tier != Tier::Global {
            self.promote_copy(item, Tier::Global);
        } else if item.metadata.priority >= PRIORITY_PROJECT_THRESHOLD && tier == Tier::Session {
            self.promote_copy(item, Tier::Project);
        }
        if item.metadata.has_any_tag(&PROMOTE_TAGS) {
            if let Some(up) = tier.promoted() {
                self.promote_copy(item, up);
            }
        }
    }

    /// Copies `item` into `target`, leaving the original tier untouched (§9
    /// Open Question: promotion copies, does not move).
    fn promote_copy(&self, item: &MemoryItem, target: Tier) {
        let result = match target {
            Tier::Session => self.session.write().unwrap().store_existing(item.clone()),
            Tier::Project => {
                let project_id = Self::project_id_of(&item.metadata);
                self.ensure_project(&project_id);
                let mut projects = self.projects.write().unwrap();
                projects.get_mut(&project_id).unwrap().store_existing(item.clone())
            }
            Tier::Global => self.global.write().unwrap().store_existing(item.clone()),
            Tier::Temporal => self.temporal.write().unwrap().store_existing(item.clone()),
        };
        if result.is_ok() {
            self.events.emit(RouterEvent::Promoted {
                item_id: item.id.clone(),
                from: item
                    .metadata
                    .project_id
                    .as_ref()
                    .map(|_| Tier::Project)
                    .unwrap_or(Tier::Session),
                to: target,
                at: Utc::now(),
            });
        }
    }

    pub fn retrieve(&self, id: &str, ctx: &RequestContext) -> Result<Option<(MemoryItem, Tier)>> {
        self.check(Operation::Retrieve, ctx, &serde_json::json!({"id": id}))?;

        if let Some(item) = self.session.write().unwrap().retrieve(id) {
            self.events.emit(RouterEvent::Retrieved { item_id: id.to_string(), tier: Tier::Session, at: Utc::now() });
            return Ok(Some((item, Tier::Session)));
        }
        for project in self.projects.write().unwrap().values_mut() {
            if let Some(item) = project.retrieve(id) {
                self.events.emit(RouterEvent::Retrieved { item_id: id.to_string(), tier: Tier::Project, at: Utc::now() });
                return Ok(Some((item, Tier::Project)));
            }
        }
        if let Some(item) = self.global.write().unwrap().retrieve(id) {
            self.events.emit(RouterEvent::Retrieved { item_id: id.to_string(), tier: Tier::Global, at: Utc::now() });
            return Ok(Some((item, Tier::Global)));
        }
        if let Some(item) = self.temporal.write().unwrap().retrieve(id) {
            self.events.emit(RouterEvent::Retrieved { item_id: id.to_string(), tier: Tier::Temporal, at: Utc::now() });
            return Ok(Some((item, Tier::Temporal)));
        }
        Ok(None)
    }

    /// Complexity + suggested tiers (§4.9 "Search" step 1).
    pub fn analyze(&self, query: &MemoryQuery) -> Vec<Tier> {
        let mut tiers = vec![Tier::Session];
        let complexity = crate::search::analyze_query_complexity(&query.text);
        use crate::search::QueryComplexity::*;
        match complexity {
            Simple | Moderate => tiers.push(Tier::Project),
            Complex => {}
        }
        match complexity {
            Moderate | Complex => tiers.push(Tier::Global),
            Simple => {}
        }
        let lower = query.text.to_lowercase();
        let mentions_history = ["history", "past", "previous"].iter().any(|w| lower.contains(w));
        let has_date_range = query
            .filters
            .as_ref()
            .map(|f| f.date_range.is_some())
            .unwrap_or(false);
        if mentions_history || has_date_range {
            tiers.push(Tier::Temporal);
        }
        tiers
    }

    /// LayerMixer's automatic strategy selection layered on top of `analyze`
    /// (§4.10): Adaptive reuses the Router's own suggested tier set, the
    /// other strategies override it with a fixed tier set.
    pub fn mix_plan(&self, query: &MemoryQuery) -> crate::mixer::MixPlan {
        let suggested = self.analyze(query);
        let strategy = crate::mixer::select_strategy(query);
        crate::mixer::plan(strategy, &suggested)
    }

    /// Dispatches to the suggested tiers and merges/re-scores the results
    /// (§4.9 "Search" steps 2-5).
    pub async fn search(&self, query: MemoryQuery, ctx: &RequestContext, deadline: std::time::Duration) -> Result<Vec<MemorySearchResult>> {
        self.check(Operation::Search, ctx, &serde_json::json!({"text": query.text}))?;
        let plan = self.mix_plan(&query);

        let results = tokio::time::timeout(deadline, self.dispatch_and_merge(&query, &plan.tiers))
            .await
            .map_err(|_| MemoryError::Cancelled)?;

        self.events.emit(RouterEvent::Searched {
            query: query.text.clone(),
            result_count: results.len(),
            at: Utc::now(),
        });
        Ok(results)
    }

    async fn dispatch_and_merge(&self, query: &MemoryQuery, tiers: &[Tier]) -> Vec<MemorySearchResult> {
        let futures = tiers
            .iter()
            .map(|tier| async move { self.search_tier(*tier, query) });
        let per_tier: Vec<Vec<MemorySearchResult>> = futures::future::join_all(futures).await;

        let mut merged = self.merge_dedup(per_tier.into_iter().flatten().collect());
        for result in &mut merged {
            result.score = self.cross_tier_score(result);
        }
        crate::model::sort_results(&mut merged);
        let limit = query.effective_limit(self.config.router.max_results);
        merged.truncate(limit);
        merged
    }

    fn search_tier(&self, tier: Tier, query: &MemoryQuery) -> Vec<MemorySearchResult> {
        match tier {
            // SessionLayer::search takes &mut self to track activity counters.
            Tier::Session => self.session.write().unwrap().search(query),
            Tier::Project => self
                .projects
                .read()
                .unwrap()
                .values()
                .flat_map(|p| p.search(query))
                .collect(),
            Tier::Global => self.global.read().unwrap().search(query),
            Tier::Temporal => self.temporal.read().unwrap().search(query),
        }
    }

    /// Deduplicates by a 32-bit rolling hash of the content string, keeping
    /// the highest-scoring representative and merging explanations (§4.9 step 3).
    fn merge_dedup(&self, results: Vec<MemorySearchResult>) -> Vec<MemorySearchResult> {
        let mut by_hash: HashMap<u32, MemorySearchResult> = HashMap::new();
        for result in results {
            let hash = content_hash32(&result.item.content);
            by_hash
                .entry(hash)
                .and_modify(|existing| {
                    if result.score > existing.score {
                        let kept_explanation = existing.explanation.clone();
                        *existing = result.clone();
                        existing.explanation = format!("{} | {}", kept_explanation, result.explanation);
                    } else {
                        existing.explanation = format!("{} | {}", existing.explanation, result.explanation);
                    }
                })
                .or_insert(result);
        }
        by_hash.into_values().collect()
    }

    /// `final = baseScore·w_relevance + recencyScore·w_recency +
    /// frequencyScore·w_frequency + priorityScore·w_priority + tierBonus` (§4.9 step 4).
    fn cross_tier_score(&self, result: &MemorySearchResult) -> f32 {
        let weights = &self.config.router.scoring_weights;
        let now = Utc::now();
        let age = now - result.item.created_at;
        let recency_score = if age <= chrono::Duration::days(1) {
            1.0
        } else if age <= chrono::Duration::days(7) {
            0.7
        } else if age <= chrono::Duration::days(30) {
            0.4
        } else {
            0.1
        };
        let frequency_score = (result.item.access_count as f32 / 10.0).min(1.0);
        let priority_score = result.item.metadata.priority as f32 / 10.0;

        let score = result.score * weights.relevance
            + recency_score * weights.recency
            + frequency_score * weights.frequency
            + priority_score * weights.priority
            + result.source_tier.tier_bonus();
        score.clamp(0.0, 1.0)
    }

    /// Exports matching items from `from`, stores them in `to`, then deletes
    /// them from `from`. Non-atomic: a source-delete failure leaves a
    /// duplicate, which dedup on search makes safe (§4.9 "Migration").
    pub fn migrate(&self, from: TierTarget, to: TierTarget, filter: &MemoryFilters) -> Result<MigrationReport> {
        let items = self.export_tier(&from, filter)?;
        let mut moved = 0;
        let mut duplicated = 0;
        for item in items {
            let stored = self.store_into_tier(&to, item.clone());
            match stored {
                Ok(()) => {
                    if self.delete_from_tier(&from, &item.id) {
                        moved += 1;
                    } else {
                        duplicated += 1;
                    }
                }
                Err(_) => continue,
            }
        }
        self.events.emit(RouterEvent::Migrated {
            from: from.tier(),
            to: to.tier(),
            moved,
            at: Utc::now(),
        });
        Ok(MigrationReport { moved, duplicated })
    }

    fn export_tier(&self, target: &TierTarget, filter: &MemoryFilters) -> Result<Vec<MemoryItem>> {
        let items = match target {
            TierTarget::Session => self.session.read().unwrap().values_snapshot(),
            TierTarget::Global => self.global.read().unwrap().peek_all(),
            TierTarget::Temporal => self.temporal.read().unwrap().peek_all(),
            TierTarget::Project(id) => self
                .projects
                .read()
                .unwrap()
                .get(id)
                .map(|p| p.peek_all())
                .ok_or_else(|| MemoryError::NotFound(format!("project {id}")))?,
        };
        Ok(items.into_iter().filter(|item| filter.matches(item)).collect())
    }

    fn store_into_tier(&self, target: &TierTarget, item: MemoryItem) -> Result<()> {
        match target {
            TierTarget::Session => self.session.write().unwrap().store_existing_public(item),
            TierTarget::Global => self.global.write().unwrap().store_existing_public(item),
            TierTarget::Temporal => self.temporal.write().unwrap().store_existing_public(item),
            TierTarget::Project(id) => {
                self.ensure_project(id);
                self.projects.write().unwrap().get_mut(id).unwrap().store_existing_public(item)
            }
        }
    }

    fn delete_from_tier(&self, target: &TierTarget, id: &str) -> bool {
        match target {
            TierTarget::Session => self.session.write().unwrap().delete(id),
            TierTarget::Global => self.global.write().unwrap().delete(id),
            TierTarget::Temporal => self.temporal.write().unwrap().delete(id),
            TierTarget::Project(pid) => self
                .projects
                .write()
                .unwrap()
                .get_mut(pid)
                .map(|p| p.delete(id))
                .unwrap_or(false),
        }
    }

    /// Promotes Session's promotion candidates to Project, and archives cold
    /// Global items to Temporal (§4.9 "Cross-tier optimization (scheduled)").
    pub fn run_scheduled_optimization(&self) -> Result<()> {
        let candidate_ids = self.session.read().unwrap().get_promotion_candidates();
        for id in candidate_ids {
            if let Some(item) = self.session.write().unwrap().retrieve(&id) {
                self.promote_copy(&item, Tier::Project);
            }
        }

        let cold_ids: Vec<String> = {
            let global = self.global.read().unwrap();
            let now = Utc::now();
            global
                .peek_all()
                .into_iter()
                .filter(|item| {
                    (now - item.created_at).num_days() >= crate::layers::global::ARCHIVE_MIN_AGE_DAYS
                        && item.access_count < crate::layers::global::ARCHIVE_MAX_ACCESS_COUNT
                })
                .map(|item| item.id)
                .collect()
        };
        for id in cold_ids {
            if let Some(item) = self.global.write().unwrap().retrieve(&id) {
                self.temporal.write().unwrap().store_existing_public(item)?;
                self.global.write().unwrap().delete(&id);
            }
        }
        Ok(())
    }

    pub fn relationships(&self) -> &Mutex<RelationshipEngine> {
        &self.relationships
    }

    pub fn search_engine(&self) -> &Mutex<AdvancedSearchEngine> {
        &self.search_engine
    }

    pub fn global(&self) -> &RwLock<GlobalLayer> {
        &self.global
    }

    pub fn temporal(&self) -> &RwLock<TemporalLayer> {
        &self.temporal
    }

    pub fn session(&self) -> &RwLock<SessionLayer> {
        &self.session
    }

    pub fn projects(&self) -> &RwLock<HashMap<String, ProjectLayer>> {
        &self.projects
    }

    pub fn graph(&self) -> &RwLock<Box<dyn GraphLayer>> {
        &self.graph
    }

    /// Loads any persisted snapshots under `data_dir` into the three
    /// durable tiers (§4.3/§4.4/§4.5 "Persistence"). Called once at startup;
    /// a missing snapshot file is not an error, matching `load_from_disk`'s
    /// own per-tier behavior. Project directories are discovered by listing
    /// `<data_dir>/project/`.
    pub fn load_from_disk(&self) -> Result<()> {
        self.global.write().unwrap().load_from_disk()?;
        self.temporal.write().unwrap().load_from_disk()?;

        let project_root = self.data_dir.join("project");
        if let Ok(entries) = std::fs::read_dir(&project_root) {
            for entry in entries.flatten() {
                if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    continue;
                }
                let Some(project_id) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                self.ensure_project(&project_id);
                let mut projects = self.projects.write().unwrap();
                projects.get_mut(&project_id).unwrap().load_from_disk()?;
            }
        }
        Ok(())
    }

    /// Spawns the periodic dirty-flag-driven flush tasks for every durable
    /// tier (§4.3 "periodic flush... default period 5-15 minutes"). Project
    /// tiers are discovered dynamically on each tick since `ensure_project`
    /// can add new ones at any time.
    pub fn spawn_persistence_tasks(self: &Arc<Self>, period: std::time::Duration) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        {
            let router = Arc::clone(self);
            let dirty = router.global.read().unwrap().dirty_flag();
            handles.push(crate::persistence::spawn_periodic_flush(dirty, period, move || {
                router.global.read().unwrap().flush()
            }));
        }
        {
            let router = Arc::clone(self);
            let dirty = router.temporal.read().unwrap().dirty_flag();
            handles.push(crate::persistence::spawn_periodic_flush(dirty, period, move || {
                router.temporal.read().unwrap().flush()
            }));
        }
        {
            let router = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    let projects = router.projects.read().unwrap();
                    for project in projects.values() {
                        if project.dirty_flag().is_dirty() {
                            if let Err(e) = project.flush() {
                                tracing::warn!(error = %e, project = project.project_id(), "periodic project flush failed");
                            }
                        }
                    }
                }
            }));
        }

        handles
    }

    /// Synchronously flushes every durable tier; used at clean shutdown
    /// (§4.3 "close() flushes synchronously").
    pub fn close(&self) -> Result<()> {
        self.global.read().unwrap().flush()?;
        self.temporal.read().unwrap().flush()?;
        for project in self.projects.read().unwrap().values() {
            project.close()?;
        }
        Ok(())
    }
}

/// A 32-bit rolling (polynomial) hash of the content string, used for
/// cross-tier dedup (§4.9 "Merge") and reused as the basis for the search
/// cache's content-addressed key discipline (§4.8).
fn content_hash32(content: &str) -> u32 {
    let mut hash: u32 = 0;
    for byte in content.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(byte as u32);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StratumConfig;

    fn test_router() -> Router {
        let mut config = StratumConfig::default();
        config.session.max_items = 2;
        Router::new(config)
    }

    #[test]
    fn classify_routes_high_priority_to_global() {
        let router = test_router();
        let req = StoreRequest {
            content: "x".to_string(),
            metadata: MemoryMetadata {
                priority: 9,
                ..Default::default()
            },
            requested_tier: None,
            id: None,
        };
        assert_eq!(router.classify(&req), Tier::Global);
    }

    #[test]
    fn classify_routes_large_content_to_project() {
        let router = test_router();
        let req = StoreRequest {
            content: "x".repeat(6000),
            metadata: MemoryMetadata::default(),
            requested_tier: None,
            id: None,
        };
        assert_eq!(router.classify(&req), Tier::Project);
    }

    #[test]
    fn store_priority_9_lands_in_global() {
        let router = test_router();
        let outcome = router
            .store(
                StoreRequest {
                    content: "x".to_string(),
                    metadata: MemoryMetadata {
                        priority: 9,
                        ..Default::default()
                    },
                    requested_tier: None,
                    id: None,
                },
                &RequestContext::default(),
            )
            .unwrap();
        assert_eq!(outcome.tier, Tier::Global);
    }

    #[test]
    fn store_creates_a_graph_node() {
        let router = test_router();
        let outcome = router
            .store(
                StoreRequest {
                    content: "graph node test".to_string(),
                    metadata: MemoryMetadata::default(),
                    requested_tier: None,
                    id: None,
                },
                &RequestContext::default(),
            )
            .unwrap();
        assert!(router.graph().read().unwrap().nodes().iter().any(|n| n.id == outcome.item.id));
    }

    #[test]
    fn store_autolinks_shared_context_items() {
        let router = test_router();
        let meta = MemoryMetadata {
            project_id: Some("shared".to_string()),
            ..Default::default()
        };
        let first = router
            .store(
                StoreRequest {
                    content: "first shared-context item".to_string(),
                    metadata: meta.clone(),
                    requested_tier: Some(Tier::Global),
                    id: None,
                },
                &RequestContext::default(),
            )
            .unwrap();
        router
            .store(
                StoreRequest {
                    content: "second shared-context item".to_string(),
                    metadata: meta,
                    requested_tier: Some(Tier::Global),
                    id: None,
                },
                &RequestContext::default(),
            )
            .unwrap();

        let graph = router.graph().read().unwrap();
        let context_edges = graph.edges_by_type(&crate::model::RelationshipType::Context);
        assert!(context_edges.iter().any(|e| e.source == first.item.id));
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash32("hello"), content_hash32("hello"));
        assert_ne!(content_hash32("hello"), content_hash32("world"));
    }

    #[test]
    fn close_then_load_from_disk_restores_durable_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StratumConfig::default();
        config.data_dir = dir.path().to_path_buf();

        let router = Router::new(config.clone());
        router
            .store(
                StoreRequest {
                    content: "global item".to_string(),
                    metadata: MemoryMetadata { priority: 9, ..Default::default() },
                    requested_tier: None,
                    id: None,
                },
                &RequestContext::default(),
            )
            .unwrap();
        router
            .store(
                StoreRequest {
                    content: "project item".to_string(),
                    metadata: MemoryMetadata {
                        project_id: Some("p1".to_string()),
                        category: "project-specific".to_string(),
                        ..Default::default()
                    },
                    requested_tier: None,
                    id: None,
                },
                &RequestContext::default(),
            )
            .unwrap();
        router.close().unwrap();

        let reloaded = Router::new(config);
        reloaded.load_from_disk().unwrap();
        assert_eq!(reloaded.global().read().unwrap().len(), 1);
        assert_eq!(reloaded.projects().read().unwrap().get("p1").map(|p| p.len()), Some(1));
    }
}
