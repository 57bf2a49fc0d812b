//! Business profile: the per-user record every action reads from.

pub mod model;

pub use model::{
    BrandVoice, BusinessProfile, ContactInfo, CustomAttribute, Location, ProfileUpdate, Service,
};
