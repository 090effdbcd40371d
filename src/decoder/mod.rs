pub mod frame_data;
pub mod image_loader;

pub use frame_data::FrameData;
pub use image_loader::load_frame;
