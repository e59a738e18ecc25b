mod chunker;
pub mod config;
pub mod crypto;
pub mod fountain;
pub mod integrity;
pub mod metadata;
pub mod packet;
pub mod pixels;
pub mod pipeline;
pub mod video;

pub use config::FramevaultConfig;
pub use pipeline::decode::{decode_file, decode_frames, DecodedFile};
pub use pipeline::encode::{encode_bytes, encode_file, EncodeReport};
pub use pipeline::hook::{NoopHook, PipelineHook};
pub use pipeline::{
    roundtrip, CodecError, FrameSink, FrameSource, MemoryFrameSink, MemoryFrameSource,
    RoundtripResult,
};
