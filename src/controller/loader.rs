//! Asset loading behind an all-or-nothing barrier.

use futures_util::future::try_join_all;

use crate::config::AssetManifest;
use crate::controller::SceneEngine;
use crate::error::ViewerError;
use crate::model::{AnimationCatalog, AnimationName};

/// Where asset bytes come from.
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, ViewerError>;
}

/// Everything the controller needs to become ready.
pub struct LoadedAssets<E: SceneEngine> {
    pub catalog: AnimationCatalog<E::Clip>,
    pub mesh: E::Mesh,
}

pub struct AssetLoader<'a, S> {
    source: &'a S,
    manifest: &'a AssetManifest,
}

impl<'a, S: AssetSource> AssetLoader<'a, S> {
    pub fn new(source: &'a S, manifest: &'a AssetManifest) -> Self {
        Self { source, manifest }
    }

    /// Load every clip concurrently, then the character mesh. Any failure
    /// fails the whole load; no partial catalog is produced.
    pub async fn load<E: SceneEngine>(&self) -> Result<LoadedAssets<E>, ViewerError> {
        tracing::info!(clips = AnimationName::ALL.len(), "loading character assets");

        let clips = try_join_all(AnimationName::ALL.into_iter().map(|name| self.load_clip::<E>(name))).await?;
        let catalog: AnimationCatalog<E::Clip> = clips.into_iter().collect();

        let path = &self.manifest.character_mesh;
        let bytes = self.source.fetch(path).await?;
        let mesh = E::decode_mesh(path, &bytes)?;

        tracing::info!(clips = catalog.len(), "character assets ready");
        Ok(LoadedAssets { catalog, mesh })
    }

    async fn load_clip<E: SceneEngine>(&self, name: AnimationName) -> Result<(AnimationName, E::Clip), ViewerError> {
        let path = self.manifest.clip_path(name);
        let bytes = self.source.fetch(&path).await?;
        let clip = E::decode_clip(&path, name, &bytes)?;
        tracing::debug!(clip = %name, bytes = bytes.len(), "clip loaded");
        Ok((name, clip))
    }
}

/// Fetches assets relative to the page over HTTP
#[cfg(target_arch = "wasm32")]
pub struct FetchSource {
    pub base_url: String,
}

#[cfg(target_arch = "wasm32")]
impl FetchSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        if self.base_url.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), path)
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl AssetSource for FetchSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, ViewerError> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;

        let url = self.url(path);
        let js_reason = |e: wasm_bindgen::JsValue| format!("{e:?}");
        let window = web_sys::window()
            .ok_or_else(|| ViewerError::Platform("no global `window`".into()))?;
        let resp = JsFuture::from(window.fetch_with_str(&url))
            .await
            .map_err(|e| ViewerError::asset_unavailable(path, js_reason(e)))?;
        let resp: web_sys::Response = resp
            .dyn_into()
            .map_err(|_| ViewerError::asset_unavailable(path, "fetch did not return a Response"))?;
        if !resp.ok() {
            return Err(ViewerError::asset_unavailable(path, format!("HTTP {}", resp.status())));
        }
        let buf = resp
            .array_buffer()
            .map_err(|e| ViewerError::asset_unavailable(path, js_reason(e)))?;
        let buf = JsFuture::from(buf)
            .await
            .map_err(|e| ViewerError::asset_unavailable(path, js_reason(e)))?;
        Ok(js_sys::Uint8Array::new(&buf).to_vec())
    }
}

/// Reads assets from a directory on disk
#[cfg(not(target_arch = "wasm32"))]
pub struct FsSource {
    pub root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FsSource {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetSource for FsSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, ViewerError> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|e| ViewerError::asset_unavailable(path, format!("{}: {e}", full.display())))
    }
}
