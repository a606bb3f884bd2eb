//! Sound file discovery

mod scanner;

pub use scanner::{enumerate, is_sound_file, SOUND_EXTENSIONS};
