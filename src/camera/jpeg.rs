const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];
const MAX_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// True when `data` holds one complete JPEG image (SOI ... EOI).
pub fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data.starts_with(&JPEG_SOI) && data.ends_with(&JPEG_EOI)
}

/// Splits an MJPEG byte stream into frames, keeping only the newest one.
#[derive(Default)]
pub struct LatestFrame {
    buffer: Vec<u8>,
    frames_seen: u64,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > MAX_BUFFER_BYTES {
            let overflow = self.buffer.len() - MAX_BUFFER_BYTES;
            self.buffer.drain(..overflow);
        }

        let mut newest = None;
        while let Some(start) = find_marker(&self.buffer, &JPEG_SOI) {
            let Some(end_rel) = find_marker(&self.buffer[start + 2..], &JPEG_EOI) else {
                // Incomplete frame: keep it from its SOI onwards.
                self.buffer.drain(..start);
                return newest;
            };

            let end = start + 2 + end_rel + 2;
            newest = Some(self.buffer[start..end].to_vec());
            self.frames_seen += 1;
            self.buffer.drain(..end);
        }

        // No SOI left: boundary headers and trailing noise only.
        self.buffer.clear();
        newest
    }
}

fn find_marker(buffer: &[u8], marker: &[u8; 2]) -> Option<usize> {
    buffer.windows(2).position(|w| w == marker)
}
