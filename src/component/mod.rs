//! Component model: behavior trait, definitions, instance state, lifecycle.

pub mod definition;
pub(crate) mod instance;
pub mod lifecycle;
pub mod options;

use slotmap::new_key_type;

pub use definition::{Behavior, ComponentDef, Factory, Plain, Template};
pub use lifecycle::{AttachmentTracker, Lifecycle, LifecycleEvent};

new_key_type! {
    /// Handle to a component instance.
    ///
    /// Handles of destroyed instances never resolve again.
    pub struct ComponentId;
}
