//! MCP domain types
//!
//! Wire DTOs for every capability the client speaks: tools, resources,
//! prompts, completion, logging, sampling, elicitation, and roots. Field
//! names follow the protocol schema (camelCase on the wire); optional
//! fields are omitted rather than serialized as null.

pub mod capabilities;
pub mod completion;
pub mod content;
pub mod core;
pub mod elicitation;
pub mod initialization;
pub mod logging;
pub mod notifications;
pub mod prompts;
pub mod resources;
pub mod roots;
pub mod sampling;
pub mod tools;

pub use self::capabilities::*;
pub use self::completion::*;
pub use self::content::*;
pub use self::core::*;
pub use self::elicitation::*;
pub use self::initialization::*;
pub use self::logging::*;
pub use self::notifications::*;
pub use self::prompts::*;
pub use self::resources::*;
pub use self::roots::*;
pub use self::sampling::*;
pub use self::tools::*;
