//! Document sessions: the registry of open documents and their edit history.

pub mod registry;
pub mod stack;

pub use registry::{DocumentInfo, DocumentSession, SaveTarget, SessionHandle, SessionRegistry};
pub use stack::{CommandStack, CommandStackError, EditListener, StackChange};
