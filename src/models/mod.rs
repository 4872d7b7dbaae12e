pub mod clock_state;
pub mod messages;
pub mod push;

// Re-export important types
pub use clock_state::*;
pub use messages::*;
pub use push::*;
