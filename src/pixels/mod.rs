use crate::config;

/// Render a flat byte buffer as an RGBA frame: three data bytes per pixel in
/// the R, G and B channels, alpha pinned to 255. Input shorter than
/// `FRAME_BYTES` reads as zero past its end.
pub fn bytes_to_pixels(bytes: &[u8]) -> Vec<u8> {
    let mut rgba = vec![0u8; config::FRAME_PIXELS];
    for (i, px) in rgba.chunks_exact_mut(config::RGBA_CHANNELS).enumerate() {
        let off = i * config::BYTES_PER_PIXEL;
        px[0] = byte_at(bytes, off);
        px[1] = byte_at(bytes, off + 1);
        px[2] = byte_at(bytes, off + 2);
        px[3] = 255;
    }
    rgba
}

/// Inverse of [`bytes_to_pixels`]: collect the RGB channels back into a flat
/// `FRAME_BYTES` buffer, discarding alpha. A short pixel buffer reads as zero.
pub fn pixels_to_bytes(rgba: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; config::FRAME_BYTES];
    for (i, b) in bytes.iter_mut().enumerate() {
        let pixel = i / config::BYTES_PER_PIXEL;
        let channel = i % config::BYTES_PER_PIXEL;
        *b = byte_at(rgba, pixel * config::RGBA_CHANNELS + channel);
    }
    bytes
}

fn byte_at(buf: &[u8], index: usize) -> u8 {
    buf.get(index).copied().unwrap_or(0)
}
