//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod garment;
pub mod member;
pub mod search_record;

pub use garment::GarmentEntity;
pub use member::MemberEntity;
pub use search_record::SearchRecordEntity;
