use crate::{GenerateError, GenerationRequest, ImageGenerator};
use std::sync::atomic::{AtomicUsize, Ordering};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Offline generator for tests and dry runs.
///
/// Output is the PNG signature followed by the prompt, so identical
/// requests produce identical bytes.
#[derive(Debug, Default)]
pub struct MockGenerator {
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut out = PNG_SIGNATURE.to_vec();
        out.extend_from_slice(request.prompt.as_bytes());
        Ok(out)
    }
}
