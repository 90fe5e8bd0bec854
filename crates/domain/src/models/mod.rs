//! Domain models for the SquadVibe studio.

pub mod garment;
pub mod member;
pub mod place;
pub mod render;
pub mod search_record;

pub use garment::{
    AnalysisSource, CategoryFilter, CreateGarmentRequest, Garment, GarmentAnalysis,
    GarmentCategory,
};
pub use member::{CreateMemberRequest, Member};
pub use place::{MapLocation, Place, PlaceCandidate};
pub use render::{DressedImage, ModelTier, RenderResult, RenderSubject, SceneSubject};
pub use search_record::SearchRecord;
