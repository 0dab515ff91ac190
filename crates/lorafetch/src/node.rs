//! # Host node
//!
//! Entry point for the host graph: resolve a LoRA URL to a local file, load it
//! and apply it to a model. Loading and applying belong to the host and are
//! reached through [`WeightsLoader`] and [`ModelComposer`].
//!
//! A failure anywhere is never fatal to the host pipeline. [`LoraUrlNode::load_lora`]
//! logs the error and hands back the model it was given.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::{CacheResolver, FetchError, FetcherConfig};

/// Name under which the node is registered with the host
pub const DISPLAY_NAME: &str = "Load LoRA From URL .TAR";

/// Host menu category
pub const CATEGORY: &str = "loaders";

/// Sub-directory of the host input directory holding cached files
pub const CACHE_SUBDIR: &str = "url_loras";

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Turns a local weights file into the host's in-memory representation
pub trait WeightsLoader: Send + Sync {
    type Weights;

    fn load(&self, path: &Path) -> Result<Self::Weights, BoxError>;
}

/// Applies loaded weights to a model (and optionally a clip) handle
pub trait ModelComposer<W>: Send + Sync {
    type Model;
    type Clip;

    fn apply(
        &self,
        model: &Self::Model,
        clip: Option<&Self::Clip>,
        weights: &W,
        strength_model: f32,
        strength_clip: f32,
    ) -> Result<(Self::Model, Option<Self::Clip>), BoxError>;
}

/// LoRA strength input, clamped to `[MIN, MAX]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strength(f32);

impl Strength {
    pub const DEFAULT: f32 = 1.0;
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 10.0;
    pub const STEP: f32 = 0.01;

    /// Clamp into range; NaN and infinities become the default.
    pub fn new(value: f32) -> Self {
        if value.is_finite() {
            Self(value.clamp(Self::MIN, Self::MAX))
        } else {
            Self(Self::DEFAULT)
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for Strength {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to load weights from {}: {source}", .path.display())]
    Load { path: PathBuf, source: BoxError },

    #[error("Failed to apply LoRA: {0}")]
    Apply(BoxError),
}

pub struct LoraUrlNode<L, C> {
    resolver: CacheResolver,
    loader: L,
    composer: C,
}

impl<L, C> LoraUrlNode<L, C>
where
    L: WeightsLoader,
    C: ModelComposer<L::Weights>,
{
    pub fn new(resolver: CacheResolver, loader: L, composer: C) -> Self {
        Self {
            resolver,
            loader,
            composer,
        }
    }

    /// Cache under `<input_dir>/url_loras` with default fetcher settings
    pub fn from_input_dir(input_dir: &Path, loader: L, composer: C) -> Result<Self, FetchError> {
        let resolver =
            CacheResolver::with_config(input_dir.join(CACHE_SUBDIR), FetcherConfig::default())?;
        Ok(Self::new(resolver, loader, composer))
    }

    pub fn resolver(&self) -> &CacheResolver {
        &self.resolver
    }

    /// Fetch, load and apply, surfacing every failure
    pub async fn try_load_lora(
        &self,
        url: &str,
        model: &C::Model,
        strength: Strength,
    ) -> Result<C::Model, NodeError> {
        let path = self.resolver.resolve(url).await?;

        let weights = self
            .loader
            .load(&path)
            .map_err(|source| NodeError::Load {
                path: path.clone(),
                source,
            })?;

        let (patched, _clip) = self
            .composer
            .apply(model, None, &weights, strength.get(), 0.0)
            .map_err(NodeError::Apply)?;

        info!(url = %url, path = ?path, strength = strength.get(), "Applied LoRA");
        Ok(patched)
    }

    /// Fetch, load and apply; on any error log it and return `model` unchanged.
    pub async fn load_lora(&self, url: &str, model: C::Model, strength: f32) -> C::Model {
        match self.try_load_lora(url, &model, Strength::new(strength)).await {
            Ok(patched) => patched,
            Err(e) => {
                error!(url = %url, error = %e, "Error loading LoRA, keeping the original model");
                model
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct TextLoader {
        calls: AtomicUsize,
    }

    impl WeightsLoader for TextLoader {
        type Weights = String;

        fn load(&self, path: &Path) -> Result<String, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(std::fs::read_to_string(path)?)
        }
    }

    struct FailingLoader;

    impl WeightsLoader for FailingLoader {
        type Weights = String;

        fn load(&self, _path: &Path) -> Result<String, BoxError> {
            Err("not a safetensors file".into())
        }
    }

    struct Concat;

    impl ModelComposer<String> for Concat {
        type Model = String;
        type Clip = ();

        fn apply(
            &self,
            model: &String,
            clip: Option<&()>,
            weights: &String,
            strength_model: f32,
            strength_clip: f32,
        ) -> Result<(String, Option<()>), BoxError> {
            assert!(clip.is_none());
            assert_eq!(strength_clip, 0.0);
            Ok((format!("{model}+{weights}@{strength_model}"), None))
        }
    }

    fn node_in<L: WeightsLoader>(dir: &Path, loader: L) -> LoraUrlNode<L, Concat>
    where
        Concat: ModelComposer<L::Weights>,
    {
        let config = FetcherConfig::builder()
            .with_scratch_dir(dir.join("scratch"))
            .with_system_proxy(false)
            .build();
        let resolver = CacheResolver::with_config(dir.join(CACHE_SUBDIR), config).unwrap();
        LoraUrlNode::new(resolver, loader, Concat)
    }

    #[test]
    fn test_strength_bounds() {
        assert_eq!(Strength::default().get(), 1.0);
        assert_eq!(Strength::new(0.5).get(), 0.5);
        assert_eq!(Strength::new(-1.0).get(), 0.0);
        assert_eq!(Strength::new(42.0).get(), 10.0);
        assert_eq!(Strength::new(f32::NAN).get(), 1.0);
    }

    #[test]
    fn test_from_input_dir() {
        let dir = tempdir().unwrap();
        let node = LoraUrlNode::from_input_dir(dir.path(), TextLoader::default(), Concat).unwrap();
        assert_eq!(node.resolver().cache_dir(), dir.path().join("url_loras"));
        assert!(dir.path().join("url_loras").is_dir());
    }

    #[tokio::test]
    async fn test_load_lora_applies_weights() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/style.safetensors"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"style".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let node = node_in(dir.path(), TextLoader::default());
        let url = format!("{}/style.safetensors", server.uri());

        let patched = node.load_lora(&url, "base".to_string(), 0.75).await;
        assert_eq!(patched, "base+style@0.75");

        // second call is served from the cache
        let patched = node.load_lora(&url, "base".to_string(), 20.0).await;
        assert_eq!(patched, "base+style@10");
        assert_eq!(node.loader.calls.load(Ordering::SeqCst), 2);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_bad_url_returns_original_model() {
        let dir = tempdir().unwrap();
        let node = node_in(dir.path(), TextLoader::default());

        let model = node.load_lora("::::", "base".to_string(), 1.0).await;
        assert_eq!(model, "base");

        let err = node
            .try_load_lora("::::", &"base".to_string(), Strength::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Fetch(ref e) if e.is_network()));
        assert_eq!(node.loader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_http_error_returns_original_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let node = node_in(dir.path(), TextLoader::default());
        let url = format!("{}/private.safetensors", server.uri());

        assert_eq!(node.load_lora(&url, "base".to_string(), 1.0).await, "base");
        assert!(!node.resolver().is_cached(&url).await.unwrap());
    }

    #[tokio::test]
    async fn test_loader_failure_returns_original_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"garbage".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let node = node_in(dir.path(), FailingLoader);
        let url = format!("{}/broken.safetensors", server.uri());

        assert_eq!(node.load_lora(&url, "base".to_string(), 1.0).await, "base");

        let err = node
            .try_load_lora(&url, &"base".to_string(), Strength::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Load { .. }));
    }
}
