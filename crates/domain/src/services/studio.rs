//! Composition studio: the Search → Detail → Compose workflow and the
//! two-phase dress-then-composite generation.
//!
//! [`StudioSession`] is a synchronous state machine. Every generation is split
//! into `begin_*` (validate, snapshot inputs, mark rendering) and `finish_*`
//! (merge results) so the session is never locked while a slow AI call runs.
//! [`StudioOrchestrator`] drives those halves against a [`StylistService`].
//!
//! Each job carries a cancellation token and the session epoch it started in.
//! Leaving the compose screen cancels the token and bumps the epoch, and a
//! finishing job whose epoch is stale is discarded without touching state.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::stylist::{StylistError, StylistService};
use super::toast::SharedToasts;
use crate::models::{
    place::coords_query, DressedImage, Garment, MapLocation, Member, ModelTier, Place,
    RenderResult, RenderSubject, SceneSubject, SearchRecord,
};

pub const DEFAULT_SEARCH_PLACEHOLDER: &str = "Where's the vibe? (e.g. Cafe in Hanoi)";
pub const NEARBY_SEARCH_PLACEHOLDER: &str = "Search near you... (e.g. Hidden Cafe)";

/// Zoom used when replaying a history entry.
pub const HISTORY_ZOOM: f64 = 14.0;
/// Zoom used after a click on the map.
pub const POI_ZOOM: f64 = 16.0;
/// Zoom used when a place is opened.
pub const PLACE_ZOOM: f64 = 18.0;

const TRY_ON_FAILED: &str = "Try-on failed.";
const COMPOSITION_FAILED: &str = "Composition failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StudioMode {
    #[default]
    Search,
    Detail,
    Compose,
}

impl std::fmt::Display for StudioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StudioMode::Search => write!(f, "search"),
            StudioMode::Detail => write!(f, "detail"),
            StudioMode::Compose => write!(f, "compose"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Cannot {action} in {mode} mode")]
    InvalidTransition {
        action: &'static str,
        mode: StudioMode,
    },

    #[error("Member not found: {0}")]
    UnknownMember(String),

    #[error("Garment not found: {0}")]
    UnknownGarment(String),

    #[error("Place not found: {0}")]
    UnknownPlace(String),

    #[error("A generation is already in progress")]
    Busy,

    #[error("No ready models found.")]
    NoReadyModels,

    #[error("Every included member needs a garment before try-on")]
    NotReady,

    #[error("Search query cannot be empty")]
    EmptyQuery,

    #[error("Generation was cancelled")]
    Cancelled,

    #[error(transparent)]
    Stylist(#[from] StylistError),
}

/// What the primary compose button does next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryAction {
    /// Phase 1 for exactly these members.
    Dress(Vec<String>),
    /// Phase 2 over these members.
    Composite(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPhase {
    Dress,
    Composite,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryActionView {
    pub phase: ActionPhase,
    pub disabled: bool,
    pub undressed_count: usize,
}

/// Outcome of running the primary action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum RenderOutcome {
    Dress {
        #[serde(rename = "memberIds")]
        member_ids: Vec<String>,
    },
    Composite(RenderResult),
}

/// A pending place search.
#[derive(Debug, Clone)]
pub struct SearchJob {
    pub query: String,
    pub place_id: Option<String>,
    epoch: u64,
}

/// A pending Phase 1 batch.
#[derive(Debug, Clone)]
pub struct DressJob {
    pub subjects: Vec<RenderSubject>,
    pub tier: ModelTier,
    pub cancel: CancellationToken,
    /// Garment each member was dressed in, checked again before merging.
    garments: BTreeMap<String, String>,
    epoch: u64,
}

/// A pending Phase 2 composite.
#[derive(Debug, Clone)]
pub struct CompositeJob {
    pub subjects: Vec<SceneSubject>,
    pub scene_context: String,
    pub background: Option<String>,
    pub tier: ModelTier,
    pub cancel: CancellationToken,
    epoch: u64,
}

/// Serializable view of the whole session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioSnapshot {
    pub mode: StudioMode,
    pub search_query: String,
    pub is_searching: bool,
    pub search_results: Vec<Place>,
    pub selected_place: Option<Place>,
    pub search_placeholder: String,
    pub show_onboarding: bool,
    pub map_location: MapLocation,
    pub selected_member_id: Option<String>,
    pub included_member_ids: Vec<String>,
    pub assignments: BTreeMap<String, String>,
    pub intermediate_results: BTreeMap<String, String>,
    pub tier: ModelTier,
    pub skip_try_on: bool,
    pub rendering: bool,
    pub render_result: Option<RenderResult>,
    pub error: Option<String>,
    pub background_image: Option<String>,
    pub scene_context: String,
    pub primary_action: PrimaryActionView,
}

#[derive(Debug)]
pub struct StudioSession {
    mode: StudioMode,
    search_query: String,
    is_searching: bool,
    search_results: Vec<Place>,
    selected_place: Option<Place>,
    search_placeholder: String,
    show_onboarding: bool,
    map_location: MapLocation,

    members: Vec<Member>,
    garments: Vec<Garment>,

    selected_member_id: Option<String>,
    included: Vec<String>,
    assignments: BTreeMap<String, String>,
    intermediate: BTreeMap<String, String>,
    tier: ModelTier,
    skip_try_on: bool,

    rendering: bool,
    render_result: Option<RenderResult>,
    error: Option<String>,
    background_image: Option<String>,
    scene_context: String,

    epoch: u64,
    active_job: Option<CancellationToken>,
    search_epoch: u64,
}

impl Default for StudioSession {
    fn default() -> Self {
        Self::new(MapLocation::default())
    }
}

impl StudioSession {
    pub fn new(map_location: MapLocation) -> Self {
        Self {
            mode: StudioMode::Search,
            search_query: String::new(),
            is_searching: false,
            search_results: Vec::new(),
            selected_place: None,
            search_placeholder: DEFAULT_SEARCH_PLACEHOLDER.to_string(),
            show_onboarding: false,
            map_location,
            members: Vec::new(),
            garments: Vec::new(),
            selected_member_id: None,
            included: Vec::new(),
            assignments: BTreeMap::new(),
            intermediate: BTreeMap::new(),
            tier: ModelTier::default(),
            skip_try_on: false,
            rendering: false,
            render_result: None,
            error: None,
            background_image: None,
            scene_context: String::new(),
            epoch: 0,
            active_job: None,
            search_epoch: 0,
        }
    }

    // ---- accessors ----

    pub fn mode(&self) -> StudioMode {
        self.mode
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    pub fn included(&self) -> &[String] {
        &self.included
    }

    pub fn assignment(&self, member_id: &str) -> Option<&str> {
        self.assignments.get(member_id).map(String::as_str)
    }

    pub fn intermediate_result(&self, member_id: &str) -> Option<&str> {
        self.intermediate.get(member_id).map(String::as_str)
    }

    pub fn selected_member_id(&self) -> Option<&str> {
        self.selected_member_id.as_deref()
    }

    pub fn selected_place(&self) -> Option<&Place> {
        self.selected_place.as_ref()
    }

    pub fn search_results(&self) -> &[Place] {
        &self.search_results
    }

    pub fn garments(&self) -> &[Garment] {
        &self.garments
    }

    pub fn map_location(&self) -> MapLocation {
        self.map_location
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn render_result(&self) -> Option<&RenderResult> {
        self.render_result.as_ref()
    }

    pub fn set_show_onboarding(&mut self, show: bool) {
        self.show_onboarding = show;
    }

    fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == member_id)
    }

    fn garment(&self, garment_id: &str) -> Option<&Garment> {
        self.garments.iter().find(|g| g.id == garment_id)
    }

    /// Abort whatever generation is running and invalidate its results.
    fn cancel_active_job(&mut self) {
        if let Some(token) = self.active_job.take() {
            tracing::debug!(epoch = self.epoch, "Cancelling in-flight generation");
            token.cancel();
        }
        self.epoch += 1;
        self.rendering = false;
    }

    // ---- collections ----

    /// Replace the squad and closet snapshots and prune every reference to
    /// members or garments that no longer exist.
    pub fn sync_collections(&mut self, members: Vec<Member>, garments: Vec<Garment>) {
        self.members = members;
        self.garments = garments;

        let member_ids: HashSet<String> = self.members.iter().map(|m| m.id.clone()).collect();
        let garment_ids: HashSet<String> = self.garments.iter().map(|g| g.id.clone()).collect();

        let mut orphaned = Vec::new();
        self.assignments.retain(|member_id, garment_id| {
            if !member_ids.contains(member_id) {
                return false;
            }
            if !garment_ids.contains(garment_id) {
                orphaned.push(member_id.clone());
                return false;
            }
            true
        });
        for member_id in orphaned {
            self.intermediate.remove(&member_id);
        }

        self.intermediate.retain(|id, _| member_ids.contains(id));
        self.included.retain(|id| member_ids.contains(id));

        let selected_exists = self
            .selected_member_id
            .as_ref()
            .map(|id| member_ids.contains(id))
            .unwrap_or(false);
        if !selected_exists {
            self.selected_member_id = self.members.first().map(|m| m.id.clone());
        }

        if let Some(selected) = self.selected_member_id.clone() {
            if !self.included.contains(&selected) {
                self.included.push(selected);
            }
        }
        if self.included.is_empty() {
            if let Some(first) = self.members.first() {
                self.included.push(first.id.clone());
            }
        }
    }

    // ---- search ----

    /// Start a place search. Clears results, selection and error and forces
    /// search mode.
    pub fn begin_search(
        &mut self,
        query: &str,
        place_id: Option<String>,
    ) -> Result<SearchJob, StudioError> {
        if query.trim().is_empty() {
            return Err(StudioError::EmptyQuery);
        }

        if self.mode == StudioMode::Compose {
            self.cancel_active_job();
            self.background_image = None;
        }

        self.search_query = query.to_string();
        self.is_searching = true;
        self.error = None;
        self.search_results.clear();
        self.selected_place = None;
        self.mode = StudioMode::Search;
        self.show_onboarding = false;
        self.search_epoch += 1;

        Ok(SearchJob {
            query: query.to_string(),
            place_id,
            epoch: self.search_epoch,
        })
    }

    /// Map click: recentre on the clicked point then search the coordinates.
    pub fn begin_coordinate_search(
        &mut self,
        lat: f64,
        lng: f64,
        place_id: Option<String>,
    ) -> Result<SearchJob, StudioError> {
        self.map_location = MapLocation::new(lat, lng, POI_ZOOM);
        self.begin_search(&coords_query(lat, lng), place_id)
    }

    /// Apply a search result. Returns the history record to persist, or
    /// `None` when a newer search superseded this one.
    ///
    /// Overload errors are returned without an inline error so the caller can
    /// raise a toast instead.
    pub fn finish_search(
        &mut self,
        job: SearchJob,
        outcome: Result<Vec<Place>, StylistError>,
    ) -> Result<Option<SearchRecord>, StudioError> {
        if job.epoch != self.search_epoch {
            tracing::debug!(query = %job.query, "Discarding superseded search");
            return Ok(None);
        }
        self.is_searching = false;

        match outcome {
            Ok(results) => {
                self.search_results = results.clone();
                Ok(Some(SearchRecord::new(job.query, results)))
            }
            Err(e) => {
                if !e.is_overloaded() {
                    self.error = Some(e.to_string());
                }
                Err(e.into())
            }
        }
    }

    /// Replay a history entry without searching again.
    pub fn apply_history(&mut self, record: &SearchRecord) {
        self.search_query = record.query.clone();
        self.search_results = record.results.clone();
        if let Some(first) = record.results.first() {
            self.map_location = MapLocation::new(first.lat, first.lng, HISTORY_ZOOM);
        }
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.search_results.clear();
    }

    /// "Locate me" result from the client.
    pub fn locate(&mut self, location: MapLocation) {
        self.map_location = location;
        self.search_placeholder = NEARBY_SEARCH_PLACEHOLDER.to_string();
        self.show_onboarding = false;
    }

    // ---- navigation ----

    pub fn select_place(&mut self, place_id: &str) -> Result<&Place, StudioError> {
        if self.mode == StudioMode::Compose {
            return Err(StudioError::InvalidTransition {
                action: "select a place",
                mode: self.mode,
            });
        }
        let place = self
            .search_results
            .iter()
            .find(|p| p.id == place_id)
            .cloned()
            .ok_or_else(|| StudioError::UnknownPlace(place_id.to_string()))?;

        self.map_location = MapLocation::new(place.lat, place.lng, PLACE_ZOOM);
        self.mode = StudioMode::Detail;
        Ok(&*self.selected_place.insert(place))
    }

    pub fn close_detail(&mut self) -> Result<(), StudioError> {
        if self.mode != StudioMode::Detail {
            return Err(StudioError::InvalidTransition {
                action: "close the place detail",
                mode: self.mode,
            });
        }
        self.selected_place = None;
        self.mode = StudioMode::Search;
        Ok(())
    }

    /// Use one of the selected place's images as the scene background.
    pub fn visualize(&mut self, image_url: &str) -> Result<(), StudioError> {
        if self.mode != StudioMode::Detail {
            return Err(StudioError::InvalidTransition {
                action: "visualize",
                mode: self.mode,
            });
        }
        let description = self
            .selected_place
            .as_ref()
            .map(|p| p.description.clone())
            .unwrap_or_default();

        self.background_image = Some(image_url.to_string());
        self.scene_context = description;
        self.error = None;
        self.mode = StudioMode::Compose;
        Ok(())
    }

    pub fn back_to_detail(&mut self) -> Result<(), StudioError> {
        if self.mode != StudioMode::Compose {
            return Err(StudioError::InvalidTransition {
                action: "go back to the place detail",
                mode: self.mode,
            });
        }
        self.cancel_active_job();
        self.background_image = None;
        self.render_result = None;
        self.mode = StudioMode::Detail;
        Ok(())
    }

    /// Discard the result overlay and return to compose.
    pub fn close_result(&mut self) {
        self.render_result = None;
    }

    // ---- compose ----

    /// Assign a garment to a member, or clear it with `None`. Always drops the
    /// member's dressed image.
    pub fn assign(&mut self, member_id: &str, garment_id: Option<&str>) -> Result<(), StudioError> {
        if self.member(member_id).is_none() {
            return Err(StudioError::UnknownMember(member_id.to_string()));
        }
        match garment_id {
            Some(garment_id) => {
                if self.garment(garment_id).is_none() {
                    return Err(StudioError::UnknownGarment(garment_id.to_string()));
                }
                self.assignments
                    .insert(member_id.to_string(), garment_id.to_string());
            }
            None => {
                self.assignments.remove(member_id);
            }
        }
        self.intermediate.remove(member_id);
        Ok(())
    }

    /// Toggle a member in the included set. Removing the last one is a no-op.
    /// Returns whether the member is included afterwards.
    pub fn toggle_inclusion(&mut self, member_id: &str) -> Result<bool, StudioError> {
        if self.member(member_id).is_none() {
            return Err(StudioError::UnknownMember(member_id.to_string()));
        }
        if let Some(pos) = self.included.iter().position(|id| id == member_id) {
            if self.included.len() > 1 {
                self.included.remove(pos);
                return Ok(false);
            }
            return Ok(true);
        }
        self.included.push(member_id.to_string());
        Ok(true)
    }

    /// Focus a member; the focused member is always included.
    pub fn select_member(&mut self, member_id: &str) -> Result<(), StudioError> {
        if self.member(member_id).is_none() {
            return Err(StudioError::UnknownMember(member_id.to_string()));
        }
        self.selected_member_id = Some(member_id.to_string());
        if !self.included.iter().any(|id| id == member_id) {
            self.included.push(member_id.to_string());
        }
        Ok(())
    }

    pub fn update_settings(&mut self, tier: Option<ModelTier>, skip_try_on: Option<bool>) {
        if let Some(tier) = tier {
            self.tier = tier;
        }
        if let Some(skip) = skip_try_on {
            self.skip_try_on = skip;
        }
    }

    fn undressed(&self) -> Vec<String> {
        self.included
            .iter()
            .filter(|id| !self.intermediate.contains_key(*id))
            .cloned()
            .collect()
    }

    fn all_included_assigned(&self) -> bool {
        self.included
            .iter()
            .all(|id| self.member(id).is_some() && self.assignments.contains_key(id))
    }

    pub fn primary_action_view(&self) -> PrimaryActionView {
        let undressed_count = self.undressed().len();
        let dressing = !self.skip_try_on && undressed_count > 0;
        PrimaryActionView {
            phase: if dressing {
                ActionPhase::Dress
            } else {
                ActionPhase::Composite
            },
            disabled: self.rendering
                || self.included.is_empty()
                || (dressing && !self.all_included_assigned()),
            undressed_count,
        }
    }

    /// Decide what the primary compose button does.
    pub fn plan_primary_action(&self) -> Result<PrimaryAction, StudioError> {
        if self.rendering {
            return Err(StudioError::Busy);
        }
        if self.included.is_empty() {
            return Err(StudioError::NoReadyModels);
        }

        let needs_dressing = self.undressed();
        if !self.skip_try_on && !needs_dressing.is_empty() {
            if !self.all_included_assigned() {
                return Err(StudioError::NotReady);
            }
            return Ok(PrimaryAction::Dress(needs_dressing));
        }
        Ok(PrimaryAction::Composite(self.included.clone()))
    }

    fn require_compose(&self, action: &'static str) -> Result<(), StudioError> {
        if self.mode != StudioMode::Compose {
            return Err(StudioError::InvalidTransition {
                action,
                mode: self.mode,
            });
        }
        if self.rendering {
            return Err(StudioError::Busy);
        }
        Ok(())
    }

    fn start_job(&mut self) -> CancellationToken {
        let token = CancellationToken::new();
        self.active_job = Some(token.clone());
        self.rendering = true;
        self.error = None;
        token
    }

    fn is_stale(&self, epoch: u64, token: &CancellationToken) -> bool {
        epoch != self.epoch || token.is_cancelled()
    }

    /// Release a generation that will never finish. Its results, should any
    /// arrive, are discarded.
    fn abandon_job(&mut self, epoch: u64) {
        if epoch == self.epoch && self.rendering {
            tracing::warn!(epoch, "Generation abandoned before finishing");
            self.cancel_active_job();
        }
    }

    /// Release a search that will never finish.
    fn abandon_search(&mut self, epoch: u64) {
        if epoch == self.search_epoch && self.is_searching {
            tracing::warn!(epoch, "Place search abandoned before finishing");
            self.is_searching = false;
        }
    }

    /// Start Phase 1 for the given members. Members without a garment, or
    /// that no longer exist, are skipped.
    pub fn begin_dress(&mut self, member_ids: &[String]) -> Result<DressJob, StudioError> {
        self.require_compose("dress members")?;

        let mut subjects = Vec::new();
        let mut garments = BTreeMap::new();
        for member_id in member_ids {
            let Some(member) = self.member(member_id) else {
                continue;
            };
            let Some(garment) = self
                .assignments
                .get(member_id)
                .and_then(|gid| self.garment(gid))
            else {
                continue;
            };
            subjects.push(RenderSubject {
                member_id: member.id.clone(),
                member_image: member.photo_data.clone(),
                garment_image: garment.image_data.clone(),
                garment_category: garment.category.to_string(),
            });
            garments.insert(member.id.clone(), garment.id.clone());
        }

        let cancel = self.start_job();
        Ok(DressJob {
            subjects,
            tier: self.tier,
            cancel,
            garments,
            epoch: self.epoch,
        })
    }

    /// Start Phase 1 for a single member.
    pub fn begin_regenerate(&mut self, member_id: &str) -> Result<DressJob, StudioError> {
        if self.member(member_id).is_none() {
            return Err(StudioError::UnknownMember(member_id.to_string()));
        }
        self.begin_dress(&[member_id.to_string()])
    }

    /// Merge a Phase 1 batch. Any failure merges nothing.
    ///
    /// Returns the ids of members whose dressed image was stored.
    pub fn finish_dress(
        &mut self,
        job: DressJob,
        outcome: Result<Vec<DressedImage>, StylistError>,
    ) -> Result<Vec<String>, StudioError> {
        if self.is_stale(job.epoch, &job.cancel) {
            tracing::debug!(epoch = job.epoch, "Discarding stale dress results");
            return Err(StudioError::Cancelled);
        }
        self.rendering = false;
        self.active_job = None;

        match outcome {
            Ok(images) => {
                let mut merged = Vec::new();
                for dressed in images {
                    // A garment swapped mid-flight makes this image stale.
                    let current = self.assignments.get(&dressed.member_id);
                    if current.is_some() && current == job.garments.get(&dressed.member_id) {
                        merged.push(dressed.member_id.clone());
                        self.intermediate.insert(dressed.member_id, dressed.image);
                    }
                }
                Ok(merged)
            }
            Err(e) => {
                self.error = Some(message_or(&e, TRY_ON_FAILED));
                Err(e.into())
            }
        }
    }

    /// Start Phase 2. Each member contributes its dressed image if present,
    /// else its original photo.
    pub fn begin_composite(&mut self, member_ids: &[String]) -> Result<CompositeJob, StudioError> {
        self.require_compose("compose a scene")?;
        self.error = None;
        self.render_result = None;

        let subjects: Vec<SceneSubject> = member_ids
            .iter()
            .filter_map(|id| {
                let image = self
                    .intermediate
                    .get(id)
                    .cloned()
                    .or_else(|| self.member(id).map(|m| m.photo_data.clone()))?;
                Some(SceneSubject {
                    member_id: id.clone(),
                    image,
                })
            })
            .collect();

        if subjects.is_empty() {
            self.error = Some(StudioError::NoReadyModels.to_string());
            return Err(StudioError::NoReadyModels);
        }

        let cancel = self.start_job();
        Ok(CompositeJob {
            subjects,
            scene_context: self.scene_context.clone(),
            background: self.background_image.clone(),
            tier: self.tier,
            cancel,
            epoch: self.epoch,
        })
    }

    pub fn finish_composite(
        &mut self,
        job: CompositeJob,
        outcome: Result<String, StylistError>,
    ) -> Result<RenderResult, StudioError> {
        if self.is_stale(job.epoch, &job.cancel) {
            tracing::debug!(epoch = job.epoch, "Discarding stale composite result");
            return Err(StudioError::Cancelled);
        }
        self.rendering = false;
        self.active_job = None;

        match outcome {
            Ok(image) => {
                let result = RenderResult {
                    generated_image: image,
                    original_image: job.background,
                    context: job.scene_context,
                };
                self.render_result = Some(result.clone());
                Ok(result)
            }
            Err(e) => {
                self.error = Some(message_or(&e, COMPOSITION_FAILED));
                Err(e.into())
            }
        }
    }

    pub fn snapshot(&self) -> StudioSnapshot {
        StudioSnapshot {
            mode: self.mode,
            search_query: self.search_query.clone(),
            is_searching: self.is_searching,
            search_results: self.search_results.clone(),
            selected_place: self.selected_place.clone(),
            search_placeholder: self.search_placeholder.clone(),
            show_onboarding: self.show_onboarding,
            map_location: self.map_location,
            selected_member_id: self.selected_member_id.clone(),
            included_member_ids: self.included.clone(),
            assignments: self.assignments.clone(),
            intermediate_results: self.intermediate.clone(),
            tier: self.tier,
            skip_try_on: self.skip_try_on,
            rendering: self.rendering,
            render_result: self.render_result.clone(),
            error: self.error.clone(),
            background_image: self.background_image.clone(),
            scene_context: self.scene_context.clone(),
            primary_action: self.primary_action_view(),
        }
    }
}

fn message_or(error: &StylistError, fallback: &str) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// What an unfinished job holds on the session.
#[derive(Debug, Clone, Copy)]
enum Claim {
    Render(u64),
    Search(u64),
}

/// Releases the session when a job's future is dropped before `finish_*`
/// runs, e.g. on client disconnect or request timeout.
struct JobGuard {
    session: Arc<Mutex<StudioSession>>,
    cancel: Option<CancellationToken>,
    claim: Claim,
    armed: bool,
}

impl JobGuard {
    fn render(session: &Arc<Mutex<StudioSession>>, epoch: u64, cancel: &CancellationToken) -> Self {
        Self {
            session: session.clone(),
            cancel: Some(cancel.clone()),
            claim: Claim::Render(epoch),
            armed: true,
        }
    }

    fn search(session: &Arc<Mutex<StudioSession>>, epoch: u64) -> Self {
        Self {
            session: session.clone(),
            cancel: None,
            claim: Claim::Search(epoch),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

fn release(session: &mut StudioSession, claim: Claim) {
    match claim {
        Claim::Render(epoch) => session.abandon_job(epoch),
        Claim::Search(epoch) => session.abandon_search(epoch),
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(token) = &self.cancel {
            token.cancel();
        }

        let claim = self.claim;
        match self.session.try_lock() {
            Ok(mut session) => release(&mut session, claim),
            Err(_) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let session = self.session.clone();
                    handle.spawn(async move {
                        release(&mut *session.lock().await, claim);
                    });
                }
                Err(_) => tracing::error!(?claim, "No runtime to release abandoned job"),
            },
        }
    }
}

/// Shared studio session bound to a stylist backend.
pub struct StudioOrchestrator {
    session: Arc<Mutex<StudioSession>>,
    stylist: Arc<dyn StylistService>,
    toasts: SharedToasts,
}

impl StudioOrchestrator {
    pub fn new(session: StudioSession, stylist: Arc<dyn StylistService>, toasts: SharedToasts) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            stylist,
            toasts,
        }
    }

    pub fn stylist(&self) -> &Arc<dyn StylistService> {
        &self.stylist
    }

    pub async fn snapshot(&self) -> StudioSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Run a synchronous operation against the session.
    pub async fn with_session<R>(&self, f: impl FnOnce(&mut StudioSession) -> R) -> R {
        let mut session = self.session.lock().await;
        f(&mut session)
    }

    pub async fn sync_collections(&self, members: Vec<Member>, garments: Vec<Garment>) {
        self.session.lock().await.sync_collections(members, garments);
    }

    /// Free-text place search. Returns the history record to persist.
    pub async fn search(
        &self,
        query: &str,
        place_id: Option<String>,
    ) -> Result<Option<SearchRecord>, StudioError> {
        let job = self.session.lock().await.begin_search(query, place_id)?;
        self.run_search(job).await
    }

    /// Map click search at the given coordinates.
    pub async fn search_coordinates(
        &self,
        lat: f64,
        lng: f64,
        place_id: Option<String>,
    ) -> Result<Option<SearchRecord>, StudioError> {
        let job = self
            .session
            .lock()
            .await
            .begin_coordinate_search(lat, lng, place_id)?;
        self.run_search(job).await
    }

    async fn run_search(&self, job: SearchJob) -> Result<Option<SearchRecord>, StudioError> {
        let mut guard = JobGuard::search(&self.session, job.epoch);
        let started = Instant::now();
        let outcome = self
            .stylist
            .search_places(&job.query, job.place_id.as_deref())
            .await;

        match &outcome {
            Ok(places) => tracing::info!(
                query = %job.query,
                results = places.len(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Place search finished"
            ),
            Err(e) => tracing::warn!(query = %job.query, error = %e, "Place search failed"),
        }

        let result = {
            let mut session = self.session.lock().await;
            guard.disarm();
            session.finish_search(job, outcome)
        };
        if let Err(StudioError::Stylist(e)) = &result {
            if e.is_overloaded() {
                self.toasts.error(e.to_string());
            }
        }
        result
    }

    /// Run the primary compose action.
    pub async fn run_primary_action(&self) -> Result<RenderOutcome, StudioError> {
        let action = self.session.lock().await.plan_primary_action()?;
        match action {
            PrimaryAction::Dress(ids) => {
                let member_ids = self.dress(&ids).await?;
                Ok(RenderOutcome::Dress { member_ids })
            }
            PrimaryAction::Composite(ids) => {
                Ok(RenderOutcome::Composite(self.composite(&ids).await?))
            }
        }
    }

    /// Phase 1 for the given members.
    pub async fn dress(&self, member_ids: &[String]) -> Result<Vec<String>, StudioError> {
        let job = self.session.lock().await.begin_dress(member_ids)?;
        self.run_dress(job).await
    }

    /// Phase 1 again for one member.
    pub async fn regenerate(&self, member_id: &str) -> Result<Vec<String>, StudioError> {
        let job = self.session.lock().await.begin_regenerate(member_id)?;
        self.run_dress(job).await
    }

    async fn run_dress(&self, job: DressJob) -> Result<Vec<String>, StudioError> {
        let mut guard = JobGuard::render(&self.session, job.epoch, &job.cancel);
        let started = Instant::now();
        let calls = job
            .subjects
            .iter()
            .map(|subject| self.stylist.dress(subject, job.tier, &job.cancel));
        let outcome = try_join_all(calls).await;

        match &outcome {
            Ok(images) => tracing::info!(
                members = images.len(),
                tier = %job.tier,
                duration_ms = started.elapsed().as_millis() as u64,
                "Dress batch finished"
            ),
            Err(e) => tracing::warn!(
                members = job.subjects.len(),
                tier = %job.tier,
                error = %e,
                "Dress batch failed"
            ),
        }

        let mut session = self.session.lock().await;
        guard.disarm();
        session.finish_dress(job, outcome)
    }

    /// Phase 2 over the given members.
    pub async fn composite(&self, member_ids: &[String]) -> Result<RenderResult, StudioError> {
        let job = self.session.lock().await.begin_composite(member_ids)?;
        let mut guard = JobGuard::render(&self.session, job.epoch, &job.cancel);

        let started = Instant::now();
        let outcome = self
            .stylist
            .composite(
                &job.subjects,
                &job.scene_context,
                job.background.as_deref(),
                job.tier,
                &job.cancel,
            )
            .await;

        match &outcome {
            Ok(_) => tracing::info!(
                subjects = job.subjects.len(),
                tier = %job.tier,
                duration_ms = started.elapsed().as_millis() as u64,
                "Composite finished"
            ),
            Err(e) => tracing::warn!(
                subjects = job.subjects.len(),
                tier = %job.tier,
                error = %e,
                "Composite failed"
            ),
        }

        let mut session = self.session.lock().await;
        guard.disarm();
        session.finish_composite(job, outcome)
    }

    /// Closet items suited to a place from the current results.
    ///
    /// An empty closet returns nothing without asking the stylist, and ids
    /// not in the closet are dropped.
    pub async fn recommendations(&self, place_id: &str) -> Result<Vec<String>, StudioError> {
        let (place, garments) = {
            let session = self.session.lock().await;
            let place = session
                .search_results
                .iter()
                .chain(session.selected_place.iter())
                .find(|p| p.id == place_id)
                .cloned()
                .ok_or_else(|| StudioError::UnknownPlace(place_id.to_string()))?;
            (place, session.garments.clone())
        };

        if garments.is_empty() {
            return Ok(Vec::new());
        }

        let ids = match self
            .stylist
            .recommend_attire(&place.description, &garments)
            .await
        {
            Ok(ids) => ids,
            Err(e) if e.is_permission_denied() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(place_id = %place_id, error = %e, "Recommendation failed");
                Vec::new()
            }
        };

        Ok(ids
            .into_iter()
            .filter(|id| garments.iter().any(|g| &g.id == id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::models::{GarmentAnalysis, GarmentCategory};
    use crate::services::stylist::MockStylistService;

    const PHOTO: &str = "data:image/png;base64,cGhvdG8=";

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            name: format!("Member {}", id),
            photo_data: format!("{}{}", PHOTO, id),
            created_at: Utc::now(),
        }
    }

    fn garment(id: &str) -> Garment {
        Garment {
            id: id.to_string(),
            name: format!("Garment {}", id),
            category: GarmentCategory::Tops,
            image_data: "data:image/png;base64,Z2FybWVudA==".to_string(),
            color: Some("Black".to_string()),
            tags: None,
            created_at: Utc::now(),
        }
    }

    fn place(id: &str, name: &str) -> Place {
        Place {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{} at golden hour", name),
            lat: 48.8584,
            lng: 2.2945,
            image_urls: vec!["https://img.example/a.jpg".to_string()],
            suggested_attire: "Chic".to_string(),
            best_time: "Sunset".to_string(),
            tips: "Go early".to_string(),
        }
    }

    /// Session in compose mode with members m1, m2 and garments c1, c2.
    fn compose_session() -> StudioSession {
        let mut session = StudioSession::default();
        session.sync_collections(
            vec![member("m1"), member("m2")],
            vec![garment("c1"), garment("c2")],
        );
        session.search_results = vec![place("p-0-1", "Eiffel Tower")];
        session.select_place("p-0-1").unwrap();
        session.visualize("https://img.example/a.jpg").unwrap();
        session
    }

    fn dressed(member_id: &str) -> DressedImage {
        DressedImage {
            member_id: member_id.to_string(),
            image: format!("dressed-{}", member_id),
        }
    }

    fn orchestrator(stylist: MockStylistService) -> (StudioOrchestrator, Arc<MockStylistService>) {
        let stylist = Arc::new(stylist);
        let orchestrator = StudioOrchestrator::new(
            compose_session(),
            stylist.clone(),
            SharedToasts::default(),
        );
        (orchestrator, stylist)
    }

    #[test]
    fn test_sync_seeds_selected_and_included() {
        let mut session = StudioSession::default();
        session.sync_collections(vec![member("m1"), member("m2")], vec![]);
        assert_eq!(session.selected_member_id(), Some("m1"));
        assert_eq!(session.included(), &["m1".to_string()]);
    }

    #[test]
    fn test_navigation_flow() {
        let mut session = StudioSession::default();
        session.search_results = vec![place("p-0-1", "Eiffel Tower")];

        session.select_place("p-0-1").unwrap();
        assert_eq!(session.mode(), StudioMode::Detail);
        assert_eq!(session.map_location().zoom, PLACE_ZOOM);

        session.visualize("https://img.example/a.jpg").unwrap();
        assert_eq!(session.mode(), StudioMode::Compose);
        assert_eq!(session.scene_context, "Eiffel Tower at golden hour");

        session.back_to_detail().unwrap();
        assert_eq!(session.mode(), StudioMode::Detail);
        assert!(session.background_image.is_none());

        session.close_detail().unwrap();
        assert_eq!(session.mode(), StudioMode::Search);
        assert!(session.selected_place().is_none());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut session = StudioSession::default();
        assert!(matches!(
            session.visualize("x"),
            Err(StudioError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.back_to_detail(),
            Err(StudioError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.select_place("missing"),
            Err(StudioError::UnknownPlace(_))
        ));
    }

    #[test]
    fn test_blank_search_rejected() {
        let mut session = StudioSession::default();
        assert!(matches!(session.begin_search("   ", None), Err(StudioError::EmptyQuery)));
        assert!(!session.is_searching);
    }

    #[test]
    fn test_search_produces_history_record() {
        let mut session = StudioSession::default();
        let job = session.begin_search("Eiffel Tower", None).unwrap();
        assert!(session.is_searching);

        let record = session
            .finish_search(job, Ok(vec![place("p-0-1", "Eiffel Tower")]))
            .unwrap()
            .unwrap();
        assert!(record.id.starts_with('h'));
        assert_eq!(record.query, "Eiffel Tower");
        assert_eq!(session.search_results().len(), 1);
        assert!(!session.is_searching);
    }

    #[test]
    fn test_superseded_search_is_ignored() {
        let mut session = StudioSession::default();
        let first = session.begin_search("Cafe in Hanoi", None).unwrap();
        let second = session.begin_search("Pagoda in Hanoi", None).unwrap();

        assert!(session
            .finish_search(first, Ok(vec![place("p-0-1", "Cafe")]))
            .unwrap()
            .is_none());
        assert!(session.search_results().is_empty());

        session
            .finish_search(second, Ok(vec![place("p-0-2", "Pagoda")]))
            .unwrap();
        assert_eq!(session.search_results()[0].name, "Pagoda");
    }

    #[test]
    fn test_search_overload_keeps_inline_error_clear() {
        let mut session = StudioSession::default();
        let job = session.begin_search("Cafe", None).unwrap();
        let err = session
            .finish_search(job, Err(StylistError::ServiceOverloaded))
            .unwrap_err();
        assert!(matches!(err, StudioError::Stylist(StylistError::ServiceOverloaded)));
        assert!(session.error().is_none());
    }

    #[test]
    fn test_coordinate_search_recentres() {
        let mut session = StudioSession::default();
        let job = session
            .begin_coordinate_search(21.03, 105.85, Some("ChIJ123".to_string()))
            .unwrap();
        assert_eq!(job.query, "COORDS:21.03,105.85");
        assert_eq!(job.place_id.as_deref(), Some("ChIJ123"));
        assert_eq!(session.map_location().zoom, POI_ZOOM);
    }

    #[test]
    fn test_apply_history_recentres_on_first_result() {
        let mut session = StudioSession::default();
        let record = SearchRecord::new("Eiffel Tower", vec![place("p-0-1", "Eiffel Tower")]);
        session.apply_history(&record);
        assert_eq!(session.search_query, "Eiffel Tower");
        assert_eq!(session.map_location(), MapLocation::new(48.8584, 2.2945, HISTORY_ZOOM));

        session.clear_search();
        assert!(session.search_query.is_empty());
        assert!(session.search_results().is_empty());
    }

    #[test]
    fn test_locate_switches_placeholder() {
        let mut session = StudioSession::default();
        session.set_show_onboarding(true);
        session.locate(MapLocation::new(10.0, 106.0, 15.0));
        assert_eq!(session.search_placeholder, NEARBY_SEARCH_PLACEHOLDER);
        assert!(!session.show_onboarding);
    }

    #[test]
    fn test_inclusion_never_reaches_zero() {
        let mut session = compose_session();
        assert!(session.toggle_inclusion("m1").unwrap());
        assert_eq!(session.included().len(), 1);

        assert!(session.toggle_inclusion("m2").unwrap());
        assert!(!session.toggle_inclusion("m1").unwrap());
        assert_eq!(session.included(), &["m2".to_string()]);
    }

    #[test]
    fn test_select_member_includes_it() {
        let mut session = compose_session();
        session.select_member("m2").unwrap();
        assert!(session.included().contains(&"m2".to_string()));
        assert!(matches!(
            session.select_member("ghost"),
            Err(StudioError::UnknownMember(_))
        ));
    }

    #[test]
    fn test_assignment_change_invalidates_intermediate() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        let job = session.begin_dress(&["m1".to_string()]).unwrap();
        session.finish_dress(job, Ok(vec![dressed("m1")])).unwrap();
        assert_eq!(session.intermediate_result("m1"), Some("dressed-m1"));

        session.assign("m1", Some("c2")).unwrap();
        assert!(session.intermediate_result("m1").is_none());

        session.assign("m1", Some("c2")).unwrap();
        let job = session.begin_dress(&["m1".to_string()]).unwrap();
        session.finish_dress(job, Ok(vec![dressed("m1")])).unwrap();
        session.assign("m1", None).unwrap();
        assert!(session.intermediate_result("m1").is_none());
        assert!(session.assignment("m1").is_none());
    }

    #[test]
    fn test_intermediate_stable_across_unrelated_changes() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        let job = session.begin_dress(&["m1".to_string()]).unwrap();
        session.finish_dress(job, Ok(vec![dressed("m1")])).unwrap();

        session.assign("m2", Some("c2")).unwrap();
        session.toggle_inclusion("m2").unwrap();
        session.update_settings(Some(ModelTier::Flash), Some(true));
        assert_eq!(session.intermediate_result("m1"), Some("dressed-m1"));
    }

    #[test]
    fn test_assign_unknown_references() {
        let mut session = compose_session();
        assert!(matches!(
            session.assign("ghost", None),
            Err(StudioError::UnknownMember(_))
        ));
        assert!(matches!(
            session.assign("m1", Some("nope")),
            Err(StudioError::UnknownGarment(_))
        ));
    }

    #[test]
    fn test_plan_primary_action() {
        let mut session = compose_session();
        assert!(matches!(session.plan_primary_action(), Err(StudioError::NotReady)));
        assert!(session.primary_action_view().disabled);

        session.assign("m1", Some("c1")).unwrap();
        assert_eq!(
            session.plan_primary_action().unwrap(),
            PrimaryAction::Dress(vec!["m1".to_string()])
        );

        session.update_settings(None, Some(true));
        assert_eq!(
            session.plan_primary_action().unwrap(),
            PrimaryAction::Composite(vec!["m1".to_string()])
        );

        session.update_settings(None, Some(false));
        let job = session.begin_dress(&["m1".to_string()]).unwrap();
        session.finish_dress(job, Ok(vec![dressed("m1")])).unwrap();
        let view = session.primary_action_view();
        assert_eq!(view.phase, ActionPhase::Composite);
        assert_eq!(view.undressed_count, 0);
        assert!(!view.disabled);
    }

    #[test]
    fn test_dress_batch_is_all_or_nothing() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        session.assign("m2", Some("c2")).unwrap();
        session.toggle_inclusion("m2").unwrap();

        let job = session
            .begin_dress(&["m1".to_string(), "m2".to_string()])
            .unwrap();
        assert_eq!(job.subjects.len(), 2);
        assert!(session.is_rendering());

        let err = session
            .finish_dress(job, Err(StylistError::GenerationFailure("m1 failed".to_string())))
            .unwrap_err();
        assert!(matches!(err, StudioError::Stylist(_)));
        assert!(session.intermediate_result("m1").is_none());
        assert!(session.intermediate_result("m2").is_none());
        assert_eq!(session.error(), Some("m1 failed"));
        assert!(!session.is_rendering());
        assert_eq!(session.mode(), StudioMode::Compose);
    }

    #[test]
    fn test_dress_failure_without_message_uses_default() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        let job = session.begin_dress(&["m1".to_string()]).unwrap();
        let _ = session.finish_dress(job, Err(StylistError::GenerationFailure(String::new())));
        assert_eq!(session.error(), Some(TRY_ON_FAILED));
    }

    #[test]
    fn test_dress_skips_members_without_garment() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        let job = session
            .begin_dress(&["m1".to_string(), "m2".to_string(), "ghost".to_string()])
            .unwrap();
        let ids: Vec<&str> = job.subjects.iter().map(|s| s.member_id.as_str()).collect();
        assert_eq!(ids, vec!["m1"]);
    }

    #[test]
    fn test_second_generation_while_rendering_is_busy() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        let _job = session.begin_dress(&["m1".to_string()]).unwrap();
        assert!(matches!(
            session.begin_composite(&["m1".to_string()]),
            Err(StudioError::Busy)
        ));
        assert!(matches!(session.plan_primary_action(), Err(StudioError::Busy)));
    }

    #[test]
    fn test_leaving_compose_discards_late_results() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        let job = session.begin_dress(&["m1".to_string()]).unwrap();
        let token = job.cancel.clone();

        session.back_to_detail().unwrap();
        assert!(token.is_cancelled());
        assert!(!session.is_rendering());

        let err = session.finish_dress(job, Ok(vec![dressed("m1")])).unwrap_err();
        assert!(matches!(err, StudioError::Cancelled));
        assert!(session.intermediate_result("m1").is_none());
    }

    #[test]
    fn test_garment_swap_during_dress_discards_that_member() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        let job = session.begin_dress(&["m1".to_string()]).unwrap();
        session.assign("m1", Some("c2")).unwrap();

        let merged = session.finish_dress(job, Ok(vec![dressed("m1")])).unwrap();
        assert!(merged.is_empty());
        assert!(session.intermediate_result("m1").is_none());
    }

    #[test]
    fn test_composite_prefers_dressed_image() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        session.toggle_inclusion("m2").unwrap();
        let job = session.begin_dress(&["m1".to_string()]).unwrap();
        session.finish_dress(job, Ok(vec![dressed("m1")])).unwrap();

        let job = session
            .begin_composite(&["m1".to_string(), "m2".to_string()])
            .unwrap();
        assert_eq!(job.subjects[0].image, "dressed-m1");
        assert_eq!(job.subjects[1].image, format!("{}m2", PHOTO));
        assert_eq!(job.background.as_deref(), Some("https://img.example/a.jpg"));

        let result = session.finish_composite(job, Ok("scene".to_string())).unwrap();
        assert_eq!(result.generated_image, "scene");
        assert_eq!(result.original_image.as_deref(), Some("https://img.example/a.jpg"));
        assert!(session.render_result().is_some());

        session.close_result();
        assert!(session.render_result().is_none());
        assert_eq!(session.mode(), StudioMode::Compose);
    }

    #[test]
    fn test_composite_failure_stays_in_compose() {
        let mut session = compose_session();
        let job = session.begin_composite(&["m1".to_string()]).unwrap();
        let _ = session.finish_composite(job, Err(StylistError::BackgroundLoadFailure));
        assert_eq!(session.mode(), StudioMode::Compose);
        assert_eq!(
            session.error(),
            Some("Failed to load the selected background scene.")
        );
        assert!(session.render_result().is_none());
    }

    #[test]
    fn test_composite_with_no_resolvable_subjects() {
        let mut session = compose_session();
        let err = session.begin_composite(&["ghost".to_string()]).unwrap_err();
        assert!(matches!(err, StudioError::NoReadyModels));
        assert_eq!(session.error(), Some("No ready models found."));
        assert!(!session.is_rendering());
    }

    #[test]
    fn test_deleting_referenced_entities_prunes() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        session.assign("m2", Some("c2")).unwrap();
        session.toggle_inclusion("m2").unwrap();
        let job = session
            .begin_dress(&["m1".to_string(), "m2".to_string()])
            .unwrap();
        session
            .finish_dress(job, Ok(vec![dressed("m1"), dressed("m2")]))
            .unwrap();

        // m1 deleted, garment c2 deleted.
        session.sync_collections(vec![member("m2")], vec![garment("c1")]);

        assert!(session.assignment("m1").is_none());
        assert!(session.intermediate_result("m1").is_none());
        assert!(session.assignment("m2").is_none());
        assert!(session.intermediate_result("m2").is_none());
        assert_eq!(session.included(), &["m2".to_string()]);
        assert_eq!(session.selected_member_id(), Some("m2"));

        let snapshot = session.snapshot();
        assert!(snapshot.assignments.is_empty());
        assert!(snapshot.intermediate_results.is_empty());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let session = compose_session();
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["mode"], "compose");
        assert_eq!(json["primaryAction"]["phase"], "dress");
        assert!(json.get("includedMemberIds").is_some());
    }

    #[tokio::test]
    async fn test_orchestrator_primary_action_runs_both_phases() {
        let (studio, stylist) = orchestrator(MockStylistService::new());
        studio
            .with_session(|s| s.assign("m1", Some("c1")))
            .await
            .unwrap();

        let outcome = studio.run_primary_action().await.unwrap();
        assert_eq!(
            outcome,
            RenderOutcome::Dress {
                member_ids: vec!["m1".to_string()]
            }
        );
        assert_eq!(stylist.dress_calls(), 1);

        let outcome = studio.run_primary_action().await.unwrap();
        match outcome {
            RenderOutcome::Composite(result) => {
                assert_eq!(result.generated_image, MockStylistService::scene_image_for(&["m1"]));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(stylist.composite_calls(), 1);
    }

    #[tokio::test]
    async fn test_orchestrator_partial_failure_merges_nothing() {
        // m2 succeeds first, then m1 fails: the whole batch is dropped.
        let mock = MockStylistService::new()
            .with_dress_failure("m1")
            .with_member_delay("m1", Duration::from_millis(20));
        let (studio, stylist) = orchestrator(mock);
        studio
            .with_session(|s| -> Result<(), StudioError> {
                s.assign("m1", Some("c1"))?;
                s.assign("m2", Some("c2"))?;
                s.toggle_inclusion("m2").map(|_| ())
            })
            .await
            .unwrap();

        let err = studio.run_primary_action().await.unwrap_err();
        assert!(matches!(err, StudioError::Stylist(StylistError::GenerationFailure(_))));
        assert_eq!(stylist.dress_calls(), 2);

        let snapshot = studio.snapshot().await;
        assert!(snapshot.intermediate_results.is_empty());
        assert!(!snapshot.rendering);
    }

    #[tokio::test]
    async fn test_orchestrator_no_ready_models_skips_service() {
        let (studio, stylist) = orchestrator(MockStylistService::new());
        studio.sync_collections(vec![], vec![]).await;

        let err = studio.composite(&["m1".to_string()]).await.unwrap_err();
        assert!(matches!(err, StudioError::NoReadyModels));
        assert_eq!(stylist.composite_calls(), 0);
    }

    #[tokio::test]
    async fn test_orchestrator_search_exact_name_first() {
        let mock = MockStylistService::with_catalog(vec![
            place("p-0-1", "Louvre"),
            place("p-1-1", "Eiffel Tower"),
        ]);
        let (studio, _) = orchestrator(mock);

        let record = studio.search("Eiffel Tower", None).await.unwrap().unwrap();
        assert_eq!(record.results[0].name, "Eiffel Tower");
        let snapshot = studio.snapshot().await;
        assert_eq!(snapshot.mode, StudioMode::Search);
        assert_eq!(snapshot.search_results[0].name, "Eiffel Tower");
    }

    #[tokio::test]
    async fn test_orchestrator_overload_raises_toast() {
        let mock = MockStylistService::new().with_search_error(StylistError::ServiceOverloaded);
        let stylist = Arc::new(mock);
        let toasts = SharedToasts::default();
        let studio = StudioOrchestrator::new(StudioSession::default(), stylist, toasts.clone());

        assert!(studio.search("Cafe in Hanoi", None).await.is_err());
        let current = toasts.current();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].message, "Model overloaded. Please try again later.");
    }

    #[tokio::test]
    async fn test_orchestrator_navigation_cancels_in_flight_dress() {
        let mock = MockStylistService::new().with_dress_delay(Duration::from_secs(30));
        let (studio, _) = orchestrator(mock);
        let studio = Arc::new(studio);
        studio
            .with_session(|s| s.assign("m1", Some("c1")))
            .await
            .unwrap();

        let running = {
            let studio = studio.clone();
            tokio::spawn(async move { studio.dress(&["m1".to_string()]).await })
        };
        while !studio.with_session(|s| s.is_rendering()).await {
            tokio::task::yield_now().await;
        }

        studio.with_session(|s| s.back_to_detail()).await.unwrap();
        let result = running.await.unwrap();
        assert!(matches!(result, Err(StudioError::Cancelled)));
        assert!(studio.snapshot().await.intermediate_results.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_render_releases_session() {
        let mock = MockStylistService::new().with_dress_delay(Duration::from_secs(30));
        let (studio, stylist) = orchestrator(mock);
        let studio = Arc::new(studio);
        studio
            .with_session(|s| s.assign("m1", Some("c1")))
            .await
            .unwrap();

        let running = {
            let studio = studio.clone();
            tokio::spawn(async move { studio.run_primary_action().await })
        };
        while !studio.with_session(|s| s.is_rendering()).await {
            tokio::task::yield_now().await;
        }

        running.abort();
        assert!(running.await.unwrap_err().is_cancelled());

        let snapshot = studio.snapshot().await;
        assert!(!snapshot.rendering);
        assert!(snapshot.intermediate_results.is_empty());
        assert_eq!(
            studio.with_session(|s| s.plan_primary_action()).await.unwrap(),
            PrimaryAction::Dress(vec!["m1".to_string()])
        );
        assert_eq!(stylist.dress_calls(), 1);
    }

    #[tokio::test]
    async fn test_dropped_render_discards_late_finish() {
        let mut session = compose_session();
        session.assign("m1", Some("c1")).unwrap();
        let job = session.begin_dress(&["m1".to_string()]).unwrap();
        let session = Arc::new(Mutex::new(session));

        drop(JobGuard::render(&session, job.epoch, &job.cancel));
        assert!(job.cancel.is_cancelled());

        let mut session = session.lock().await;
        assert!(!session.is_rendering());
        let late = session.finish_dress(job, Ok(vec![dressed("m1")]));
        assert!(matches!(late, Err(StudioError::Cancelled)));
        assert!(session.snapshot().intermediate_results.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_search_clears_searching_flag() {
        let mut session = StudioSession::default();
        let job = session.begin_search("Cafe in Hanoi", None).unwrap();
        let session = Arc::new(Mutex::new(session));

        // Release is deferred to a task while the session is locked.
        let held = session.lock().await;
        drop(JobGuard::search(&session, job.epoch));
        assert!(held.snapshot().is_searching);
        drop(held);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!session.lock().await.snapshot().is_searching);
    }

    struct RecordingStylist {
        recommend_calls: AtomicUsize,
        ids: Vec<String>,
    }

    #[async_trait::async_trait]
    impl StylistService for RecordingStylist {
        async fn dress(
            &self,
            subject: &RenderSubject,
            _tier: ModelTier,
            _cancel: &CancellationToken,
        ) -> Result<DressedImage, StylistError> {
            Ok(dressed(&subject.member_id))
        }

        async fn composite(
            &self,
            _subjects: &[SceneSubject],
            _scene_context: &str,
            _background: Option<&str>,
            _tier: ModelTier,
            _cancel: &CancellationToken,
        ) -> Result<String, StylistError> {
            Ok("scene".to_string())
        }

        async fn search_places(
            &self,
            _query: &str,
            _place_id: Option<&str>,
        ) -> Result<Vec<Place>, StylistError> {
            Ok(Vec::new())
        }

        async fn analyze_garment(
            &self,
            _image: &str,
            _hint: Option<&str>,
            _tier: ModelTier,
        ) -> Result<GarmentAnalysis, StylistError> {
            Ok(GarmentAnalysis::fallback())
        }

        async fn recommend_attire(
            &self,
            _place_description: &str,
            _closet: &[Garment],
        ) -> Result<Vec<String>, StylistError> {
            self.recommend_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.ids.clone())
        }

        async fn generate_base_model(
            &self,
            photo: &str,
            _instructions: Option<&str>,
            _tier: ModelTier,
        ) -> Result<String, StylistError> {
            Ok(photo.to_string())
        }
    }

    #[tokio::test]
    async fn test_recommendations_drop_unknown_ids() {
        let stylist = Arc::new(RecordingStylist {
            recommend_calls: AtomicUsize::new(0),
            ids: vec!["c2".to_string(), "invented".to_string()],
        });
        let studio = StudioOrchestrator::new(compose_session(), stylist.clone(), SharedToasts::default());

        let ids = studio.recommendations("p-0-1").await.unwrap();
        assert_eq!(ids, vec!["c2".to_string()]);
        assert_eq!(stylist.recommend_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recommendations_empty_closet_skips_service() {
        let stylist = Arc::new(RecordingStylist {
            recommend_calls: AtomicUsize::new(0),
            ids: vec!["c1".to_string()],
        });
        let studio = StudioOrchestrator::new(compose_session(), stylist.clone(), SharedToasts::default());
        studio.sync_collections(vec![member("m1")], vec![]).await;

        assert!(studio.recommendations("p-0-1").await.unwrap().is_empty());
        assert_eq!(stylist.recommend_calls.load(Ordering::SeqCst), 0);
    }
}
