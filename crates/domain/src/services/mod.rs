//! Domain services for the SquadVibe studio.
//!
//! Services contain business logic that operates on domain models.

pub mod closet;
pub mod intake;
pub mod studio;
pub mod stylist;
pub mod toast;

pub use closet::{
    distinct_tags, ClosetFilter, ColorSwatch, DefaultGarment, COLOR_PALETTE, DEFAULT_WARDROBE,
    SEARCH_SUGGESTIONS,
};
pub use intake::IntakeService;
pub use studio::{
    ActionPhase, PrimaryAction, PrimaryActionView, RenderOutcome, StudioError, StudioMode, StudioOrchestrator, StudioSession,
    StudioSnapshot,
};
pub use stylist::{MockStylistService, StylistError, StylistService};
pub use toast::{SharedToasts, Toast, ToastKind, ToastQueue};
