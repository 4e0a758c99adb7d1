pub mod entity;

pub use entity::{now_millis, Entity, EntityDraft, EntityId, EntityPatch, LocalToken};
