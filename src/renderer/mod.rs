pub mod preview;

pub use preview::{render_half_blocks, save_png};
