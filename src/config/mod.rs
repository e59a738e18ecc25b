/// Identifies a framevault packet. First two header bytes, little-endian.
pub const MAGIC: u16 = 0xDB02;

// Frame geometry. The wire format assumes a fixed raster, so none of this is
// configurable at runtime.
pub const FRAME_WIDTH: usize = 1920;
pub const FRAME_HEIGHT: usize = 1080;
pub const BYTES_PER_PIXEL: usize = 3;
pub const RGBA_CHANNELS: usize = 4;

/// Data bytes carried by one frame: one byte per RGB channel.
pub const FRAME_BYTES: usize = FRAME_WIDTH * FRAME_HEIGHT * BYTES_PER_PIXEL;

/// Size of an RGBA pixel buffer exchanged with the muxer.
pub const FRAME_PIXELS: usize = FRAME_WIDTH * FRAME_HEIGHT * RGBA_CHANNELS;

// Packet layout
pub const PACKET_HEADER_SIZE: usize = 19;
pub const MAX_PAYLOAD: usize = FRAME_BYTES - PACKET_HEADER_SIZE;

// Packet flag bits
pub const FLAG_ENCRYPTED: u8 = 0x01;
pub const FLAG_REPAIR: u8 = 0x02;

// Encryption envelope: salt || iv || ciphertext+tag
pub const SALT_SIZE: usize = 16;
pub const IV_SIZE: usize = 12;
pub const AEAD_TAG_SIZE: usize = 16;
pub const ENVELOPE_OVERHEAD: usize = SALT_SIZE + IV_SIZE + AEAD_TAG_SIZE;

// PBKDF2-HMAC-SHA256 parameters
pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const KEY_SIZE: usize = 32;

// Fountain code
pub const REDUNDANCY_RATIO: f64 = 0.3;
pub const MIN_REPAIR_DEGREE: usize = 2;
pub const MAX_REPAIR_DEGREE: usize = 5;

pub const DEFAULT_FPS: u32 = 30;

pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Runtime configuration for an encode/decode operation. Everything that
/// affects the wire format is a constant above; only muxer presentation
/// knobs live here.
#[derive(Debug, Clone)]
pub struct FramevaultConfig {
    pub fps: u32,
}

impl Default for FramevaultConfig {
    fn default() -> Self {
        Self { fps: DEFAULT_FPS }
    }
}
