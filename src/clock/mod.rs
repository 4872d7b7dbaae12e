pub mod actor;
pub mod reconciler;
pub mod source;

// Re-export important types
pub use actor::*;
pub use reconciler::*;
pub use source::*;
