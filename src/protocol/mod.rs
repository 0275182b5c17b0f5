//! Message and state types shared by the socket and its transport.
//!
//! # Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | [`Payload`] | Local → Remote | Outbound text or JSON value |
//! | [`Message`] | Remote → Local | Whole inbound message |
//! | [`CloseStatus`] | Remote → Local | Close code and reason |
//! | [`ReadyState`] | - | Composite connectivity state |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Inbound message and close status |
//! | `payload` | Outbound payload |
//! | `state` | Ready-state constants |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound message types.
pub mod message;

/// Outbound payload type.
pub mod payload;

/// Ready-state enum and conversions.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{ABNORMAL_CLOSE_CODE, CloseStatus, Message, MessageData, NORMAL_CLOSE_CODE};
pub use payload::Payload;
pub use state::ReadyState;
