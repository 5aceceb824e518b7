//! Code-generation collaborator seam.
//!
//! The core never talks to a model provider itself: callers implement
//! [`CodeGenerator`] over whatever client they use (a local model, an HTTP
//! API). The call is blocking from the core's point of view; suspension and
//! retry policy belong to the implementing client.
//!
//! What the core does own is the on-disk cache: generated sources are keyed
//! by a SHA-256 fingerprint of the request, so repeated requests for the
//! same function cost nothing.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::Result;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A request for one generated function.
#[derive(Debug, Clone, PartialEq)]
pub struct CodegenRequest {
    /// Function name to generate.
    pub name: String,
    /// Parameter names, in order.
    pub params: Vec<String>,
    /// What the function should do.
    pub description: String,
    /// Optional (input, expected output) examples.
    pub examples: Vec<(String, String)>,
    /// Target language ("python", "rust", ...).
    pub language: String,
}

impl CodegenRequest {
    /// Stable fingerprint of every request field. Field values are
    /// length-prefixed so concatenation ambiguities cannot collide.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let mut feed = |s: &str| {
            hasher.update((s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        };
        feed(&self.name);
        for p in &self.params {
            feed(p);
        }
        feed(&self.description);
        for (input, output) in &self.examples {
            feed(input);
            feed(output);
        }
        feed(&self.language);
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

// ---------------------------------------------------------------------------
// The generator seam
// ---------------------------------------------------------------------------

/// Implemented by external clients that can synthesize code on demand.
pub trait CodeGenerator {
    fn generate(&self, request: &CodegenRequest) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Disk cache
// ---------------------------------------------------------------------------

/// On-disk cache of generated sources, keyed by request fingerprint.
pub struct CodegenCache {
    dir: PathBuf,
}

impl CodegenCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, request: &CodegenRequest) -> PathBuf {
        self.dir
            .join(format!("{}.{}", request.fingerprint(), ext(&request.language)))
    }

    /// Look up a cached source for this request.
    pub fn get(&self, request: &CodegenRequest) -> Option<String> {
        fs::read_to_string(self.entry_path(request)).ok()
    }

    /// Store a generated source under this request's fingerprint.
    pub fn put(&self, request: &CodegenRequest, source: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.entry_path(request), source)?;
        Ok(())
    }

    /// Fetch from cache, or call the generator and cache its output.
    pub fn get_or_generate(
        &self,
        request: &CodegenRequest,
        generator: &dyn CodeGenerator,
    ) -> Result<String> {
        if let Some(cached) = self.get(request) {
            tracing::debug!(name = %request.name, "codegen cache hit");
            return Ok(cached);
        }
        let source = generator.generate(request)?;
        self.put(request, &source)?;
        Ok(source)
    }
}

fn ext(language: &str) -> &str {
    match language {
        "python" => "py",
        "rust" => "rs",
        "javascript" => "js",
        _ => "txt",
    }
}

/// Default cache location relative to a working directory.
pub fn default_cache(base: &Path) -> CodegenCache {
    CodegenCache::new(base.join(".codegen_cache"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
