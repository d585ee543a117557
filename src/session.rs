pub mod controller;
pub mod correlator;
pub mod editor;
pub mod merger;
pub mod navigator;
pub mod scheduler;

// Re-export public types
pub use controller::{FrameSink, SessionController, SessionKey, SessionView};
pub use correlator::{ResponseCorrelator, Verdict};
pub use editor::{BufferEditor, EditError, EditorSurface};
pub use merger::{EditOperation, MERGE_PUNCTUATION, merge};
pub use navigator::SuggestionNavigator;
pub use scheduler::{SendScheduler, prompt_window};
