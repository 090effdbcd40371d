pub mod extractor;
pub mod frame_manager;
pub mod packer;
pub mod processor;
