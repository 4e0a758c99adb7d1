pub mod reconciler;

pub use reconciler::{Mutation, MutationHandle, Reconciler};
