//! One designer's working session: upload, options, generate, download.

use crate::{
    auth::IdentitySubscription,
    encoder::{self, GarmentAsset, PreviewRegistry},
    error::{AuthError, Result, StudioError},
    models::{AspectRatio, GenerationRequest, GenerationResult, PresentationStyle},
    presentation::PresentationClient,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_BRAND_NAME: &str = "Adama Paris";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudioState {
    Idle,
    AwaitingUpload,
    Ready,
    Generating,
    Success,
    Failed,
}

/// Owns the garment asset and the latest result. Errors from any step end up
/// as one user-facing message in [`Studio::error_message`].
pub struct Studio {
    client: Arc<dyn PresentationClient>,
    registry: PreviewRegistry,
    identity: Option<IdentitySubscription>,
    asset: Option<GarmentAsset>,
    brand_name: String,
    style: PresentationStyle,
    aspect_ratio: AspectRatio,
    state: StudioState,
    result: Option<GenerationResult>,
    error: Option<String>,
}

impl Studio {
    pub fn new(client: Arc<dyn PresentationClient>) -> Self {
        Self {
            client,
            registry: PreviewRegistry::new(),
            identity: None,
            asset: None,
            brand_name: DEFAULT_BRAND_NAME.to_string(),
            style: PresentationStyle::default(),
            aspect_ratio: AspectRatio::default(),
            state: StudioState::Idle,
            result: None,
            error: None,
        }
    }

    /// Gates generation on a signed-in identity.
    pub fn with_identity(mut self, subscription: IdentitySubscription) -> Self {
        self.identity = Some(subscription);
        self
    }

    pub fn with_registry(mut self, registry: PreviewRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn state(&self) -> StudioState {
        self.state
    }

    pub fn asset(&self) -> Option<&GarmentAsset> {
        self.asset.as_ref()
    }

    pub fn brand_name(&self) -> &str {
        &self.brand_name
    }

    pub fn style(&self) -> PresentationStyle {
        self.style
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    /// Only exposed when the last cycle succeeded.
    pub fn result(&self) -> Option<&GenerationResult> {
        match self.state {
            StudioState::Success => self.result.as_ref(),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The submit trigger is enabled only with an asset, nothing in flight,
    /// and a signed-in user when the identity gate is attached.
    pub fn can_generate(&self) -> bool {
        self.asset.is_some() && self.state != StudioState::Generating && self.identity_allows()
    }

    fn identity_allows(&self) -> bool {
        self.identity
            .as_ref()
            .map_or(true, |subscription| subscription.current().is_some())
    }

    /// Re-evaluates the gate after a sign-in or sign-out. Returns whether
    /// generation is now enabled.
    pub fn sync_identity(&mut self) -> bool {
        if let Some(subscription) = self.identity.as_mut() {
            if subscription.has_changed() {
                match subscription.acknowledge() {
                    Some(user) => log::info!("Studio unlocked for {}", user.uid),
                    None => log::info!("Studio locked: signed out"),
                }
            }
        }
        self.can_generate()
    }

    pub fn upload_bytes(&mut self, bytes: Vec<u8>, file_name: Option<&str>) -> Result<()> {
        self.state = StudioState::AwaitingUpload;
        let encoded = encoder::encode_bytes(bytes, file_name, &self.registry);
        self.finish_upload(encoded)
    }

    pub async fn upload_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.state = StudioState::AwaitingUpload;
        let encoded = encoder::encode_file(path, &self.registry).await;
        self.finish_upload(encoded)
    }

    fn finish_upload(&mut self, encoded: Result<GarmentAsset>) -> Result<()> {
        match encoded {
            Ok(asset) => {
                log::info!(
                    "Garment uploaded: {} ({} bytes)",
                    asset.content_type,
                    asset.raw.len()
                );
                // Replacing the asset drops the old preview handle, which releases it.
                self.asset = Some(asset);
                self.result = None;
                self.error = None;
                self.state = StudioState::Ready;
                Ok(())
            }
            Err(err) => {
                log::error!("Error converting file to base64: {}", err);
                Err(self.fail(err))
            }
        }
    }

    pub fn set_brand_name(&mut self, brand_name: impl Into<String>) {
        self.brand_name = brand_name.into();
        self.leave_failed();
    }

    pub fn set_style(&mut self, style: PresentationStyle) {
        self.style = style;
        self.leave_failed();
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.aspect_ratio = aspect_ratio;
        self.leave_failed();
    }

    fn leave_failed(&mut self) {
        if self.state == StudioState::Failed {
            self.error = None;
            self.state = if self.asset.is_some() {
                StudioState::Ready
            } else {
                StudioState::Idle
            };
        }
    }

    /// Runs one generation cycle. Exactly one request is sent on success paths;
    /// validation and gate failures never reach the network.
    pub async fn generate(&mut self) -> Result<GenerationResult> {
        if self.state == StudioState::Generating {
            return Err(StudioError::Validation(
                "A presentation is already being generated.".into(),
            ));
        }

        let request = match self.build_request() {
            Ok(request) => request,
            Err(err) => return Err(self.fail(err)),
        };

        self.state = StudioState::Generating;
        self.error = None;
        self.result = None;

        match self.client.generate(&request).await {
            Ok(result) => {
                log::info!("Presentation generated via {}", self.client.name());
                self.result = Some(result.clone());
                self.state = StudioState::Success;
                Ok(result)
            }
            Err(err) => {
                log::error!("Generation failed: {}", err);
                Err(self.fail(err))
            }
        }
    }

    fn build_request(&self) -> Result<GenerationRequest> {
        let asset = self.asset.as_ref().ok_or_else(|| {
            StudioError::Validation("Please upload a photo of the garment first.".into())
        })?;
        if self.brand_name.trim().is_empty() {
            return Err(StudioError::Validation(
                "Please enter a designer or brand name.".into(),
            ));
        }
        if !self.identity_allows() {
            return Err(AuthError::Unauthenticated.into());
        }

        Ok(GenerationRequest {
            encoded_image: asset.encoded_data.clone(),
            content_type: asset.content_type.clone(),
            brand_name: self.brand_name.clone(),
            style: self.style,
            aspect_ratio: self.aspect_ratio,
        })
    }

    fn fail(&mut self, err: StudioError) -> StudioError {
        self.error = Some(err.user_message());
        self.state = StudioState::Failed;
        err
    }

    /// Writes the current result as a PNG into `dir`.
    pub async fn download(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let result = self
            .result()
            .ok_or_else(|| StudioError::Validation("There is no generated image to download.".into()))?;

        let bytes = STANDARD
            .decode(result.encoded_image.as_bytes())
            .map_err(|e| StudioError::Encoding(format!("generated image is not valid base64: {}", e)))?;

        let path = dir
            .as_ref()
            .join(download_filename(&self.brand_name, self.style.label()));
        tokio::fs::write(&path, bytes).await?;
        log::info!("Presentation saved to {}", path.display());
        Ok(path)
    }
}

/// Lowercase ASCII alphanumerics, other runs collapsed to one hyphen.
fn slug(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// `studio-ia-<brand>-<style>.png`; a blank brand becomes `creation`.
pub fn download_filename(brand_name: &str, style: &str) -> String {
    let brand = match slug(brand_name) {
        s if s.is_empty() => "creation".to_string(),
        s => s,
    };
    format!("studio-ia-{}-{}.png", brand, slug(style))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{IdentityProvider, Session};
    use crate::models::{Credential, SignedIn, User};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[derive(Default)]
    struct CountingClient {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PresentationClient for CountingClient {
        async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            request.validate()?;
            if self.fail {
                return Err(StudioError::Service("model busy".into()));
            }
            Ok(GenerationResult {
                encoded_image: STANDARD.encode(b"generated"),
            })
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn studio(fail: bool) -> (Studio, Arc<CountingClient>) {
        let client = Arc::new(CountingClient {
            fail,
            ..Default::default()
        });
        (Studio::new(client.clone()), client)
    }

    #[test]
    fn test_download_filename_normalization() {
        assert_eq!(
            download_filename("Adama Paris!", "Mannequin"),
            "studio-ia-adama-paris-mannequin.png"
        );
        assert_eq!(
            download_filename("  ", "Style Urbain/Extérieur"),
            "studio-ia-creation-style-urbain-ext-rieur.png"
        );
        assert_eq!(
            download_filename("Tongoro", "Studio Minimaliste"),
            "studio-ia-tongoro-studio-minimaliste.png"
        );
    }

    #[tokio::test]
    async fn test_generate_without_asset_is_local_validation_error() {
        let (mut studio, client) = studio(false);
        let err = studio.generate().await.unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert_eq!(studio.state(), StudioState::Failed);
        assert_eq!(
            studio.error_message(),
            Some("Please upload a photo of the garment first.")
        );
    }

    #[tokio::test]
    async fn test_blank_brand_is_local_validation_error() {
        let (mut studio, client) = studio(false);
        studio.upload_bytes(PNG.to_vec(), Some("robe.png")).unwrap();
        studio.set_brand_name("   ");

        let err = studio.generate().await.unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_cycle_and_download() {
        let (mut studio, client) = studio(false);
        assert_eq!(studio.state(), StudioState::Idle);
        assert!(!studio.can_generate());

        studio.upload_bytes(PNG.to_vec(), Some("robe.png")).unwrap();
        assert_eq!(studio.state(), StudioState::Ready);
        assert!(studio.can_generate());

        studio.set_brand_name("Adama Paris!");
        studio.set_style(PresentationStyle::Mannequin);
        studio.generate().await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(studio.state(), StudioState::Success);
        assert!(studio.result().is_some());

        let dir = tempfile::tempdir().unwrap();
        let path = studio.download(dir.path()).await.unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "studio-ia-adama-paris-mannequin.png"
        );
        assert_eq!(std::fs::read(path).unwrap(), b"generated");
    }

    #[tokio::test]
    async fn test_service_failure_hides_result() {
        let (mut studio, client) = studio(true);
        studio.upload_bytes(PNG.to_vec(), None).unwrap();

        assert!(studio.generate().await.is_err());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(studio.state(), StudioState::Failed);
        assert!(studio.result().is_none());
        assert_eq!(
            studio.error_message(),
            Some("Image generation failed. The AI model may be busy. Please try again.")
        );

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            studio.download(dir.path()).await,
            Err(StudioError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_reupload_releases_previous_preview_once() {
        let registry = PreviewRegistry::new();
        let (studio, _) = studio(false);
        let mut studio = studio.with_registry(registry.clone());

        studio.upload_bytes(PNG.to_vec(), Some("first.png")).unwrap();
        studio.generate().await.unwrap();
        studio.upload_bytes(PNG.to_vec(), Some("second.png")).unwrap();

        assert_eq!(registry.allocated_count(), 2);
        assert_eq!(registry.released_count(), 1);
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.stray_release_count(), 0);
        assert_eq!(studio.state(), StudioState::Ready);
        assert!(studio.result().is_none());
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_previous_asset() {
        let (mut studio, _) = studio(false);
        studio.upload_bytes(PNG.to_vec(), Some("robe.png")).unwrap();

        let err = studio.upload_bytes(b"GIF89a".to_vec(), Some("anim.gif")).unwrap_err();
        assert!(matches!(err, StudioError::Encoding(_)));
        assert_eq!(studio.state(), StudioState::Failed);
        assert!(studio.asset().is_some());

        studio.set_aspect_ratio(AspectRatio::Landscape);
        assert_eq!(studio.state(), StudioState::Ready);
        assert_eq!(studio.error_message(), None);
    }

    struct StaticProvider;

    #[async_trait]
    impl IdentityProvider for StaticProvider {
        async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<SignedIn> {
            Ok(SignedIn {
                user: User {
                    uid: "uid-1".into(),
                    email: Some(email.into()),
                    display_name: None,
                },
                credential: Credential::new("id", "refresh", 3600),
            })
        }

        async fn sign_in_with_idp(&self, _provider_id: &str, _id_token: &str) -> Result<SignedIn> {
            Err(AuthError::Other("unused".into()).into())
        }

        async fn sign_up(&self, _email: &str, _password: &str) -> Result<SignedIn> {
            Err(AuthError::EmailAlreadyInUse.into())
        }

        async fn refresh(&self, credential: &Credential) -> Result<Credential> {
            Ok(credential.clone())
        }

        async fn lookup(&self, _id_token: &str) -> Result<User> {
            Err(AuthError::Other("unused".into()).into())
        }
    }

    #[tokio::test]
    async fn test_identity_gate_follows_session() {
        let session = Session::new(Arc::new(StaticProvider));
        let (studio, client) = studio(false);
        let mut studio = studio.with_identity(session.subscribe());
        studio.upload_bytes(PNG.to_vec(), None).unwrap();

        assert!(!studio.sync_identity());
        let err = studio.generate().await.unwrap_err();
        assert!(matches!(err, StudioError::Auth(AuthError::Unauthenticated)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);

        session.sign_in_with_password("awa@atelier.sn", "pw").await.unwrap();
        assert!(studio.sync_identity());
        studio.generate().await.unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);

        session.sign_out();
        assert!(!studio.sync_identity());
    }
}
