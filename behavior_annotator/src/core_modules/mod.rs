pub mod action_catalog;
pub mod annotation_buffer;
pub mod frame_source;
pub mod input_event;
pub mod playback;
pub mod progress_indicator;
pub mod segment_encoder;
