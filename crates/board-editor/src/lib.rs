pub mod camera;
pub mod clipboard;
pub mod config;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod history;
pub mod input;
pub mod persistence;
pub mod selection;
pub mod shortcuts;
pub mod snap;
pub mod tools;
pub mod worker;

pub use camera::Camera;
pub use clipboard::ClipboardPayload;
pub use config::EngineConfig;
pub use engine::{DispatchOutcome, Engine};
pub use error::{ClipboardError, EditorError, PersistenceError};
pub use grouping::ZOrder;
pub use history::History;
pub use input::{InputEvent, Modifiers};
pub use persistence::{Encoding, FileBackend, MemoryBackend, PersistenceBackend};
pub use selection::{Handle, SelectionManager};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use snap::{GuideLine, SnapEngine, SnapResult};
pub use tools::{Tool, ToolKind, ToolOutcome};
pub use worker::{SimplifyWorker, simplify_path};
