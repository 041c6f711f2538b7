//! slotwise — booking conflict detection and appointment lifecycle engine
//! for a professional-services marketplace.
//!
//! The [`engine::Engine`] owns every professional's schedule behind a
//! per-professional lock, journals each applied mutation, and enforces the
//! status transition table on every path. Party data (rates, profile
//! status, timezones, display names) comes from an injected
//! [`directory::Directory`].

pub mod compactor;
pub mod config;
pub mod directory;
pub mod engine;
pub mod journal;
pub mod model;
pub mod notify;
pub mod observability;
pub mod pricing;
pub mod timezone;

pub use config::SchedulerConfig;
pub use engine::{Engine, EngineError, ErrorKind};
pub use model::{
    Actor, Booking, BookingFilter, BookingStatus, BookingView, ConsultationType,
    CreateBookingRequest, Page, PagedResult, UpdateBookingRequest,
};
