//! HTTP route handlers.

pub mod closet;
pub mod health;
pub mod history;
pub mod squad;
pub mod studio;
pub mod toasts;
