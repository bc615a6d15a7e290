use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scene a garment is presented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PresentationStyle {
    #[default]
    MinimalistStudio,
    OutdoorStreet,
    LuxuryBoutique,
    Mannequin,
}

impl PresentationStyle {
    pub const ALL: [PresentationStyle; 4] = [
        PresentationStyle::MinimalistStudio,
        PresentationStyle::OutdoorStreet,
        PresentationStyle::LuxuryBoutique,
        PresentationStyle::Mannequin,
    ];

    /// Label shown to designers and sent on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            PresentationStyle::MinimalistStudio => "Studio Minimaliste",
            PresentationStyle::OutdoorStreet => "Style Urbain/Extérieur",
            PresentationStyle::LuxuryBoutique => "Boutique de Luxe",
            PresentationStyle::Mannequin => "Mannequin",
        }
    }

    /// Strict lookup by product label or English name, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|style| {
            style.label().eq_ignore_ascii_case(value)
                || style.english_name().eq_ignore_ascii_case(value)
        })
    }

    /// Unrecognized styles render as `MinimalistStudio`. Callers rely on this
    /// instead of rejecting the request.
    pub fn parse_or_default(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }

    fn english_name(&self) -> &'static str {
        match self {
            PresentationStyle::MinimalistStudio => "Minimalist Studio",
            PresentationStyle::OutdoorStreet => "Outdoor/Street",
            PresentationStyle::LuxuryBoutique => "Luxury Boutique",
            PresentationStyle::Mannequin => "Mannequin",
        }
    }
}

impl fmt::Display for PresentationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    Portrait,
    Landscape,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 2] = [AspectRatio::Portrait, AspectRatio::Landscape];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
        }
    }

    pub fn orientation(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "portrait",
            AspectRatio::Landscape => "landscape",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim() {
            "9:16" => Ok(AspectRatio::Portrait),
            "16:9" => Ok(AspectRatio::Landscape),
            other => Err(StudioError::Validation(format!(
                "Unsupported aspect ratio '{}'. Use 9:16 or 16:9.",
                other
            ))),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submission, built fresh each time the designer asks for a presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub encoded_image: String,
    pub content_type: String,
    pub brand_name: String,
    pub style: PresentationStyle,
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    /// Checks every required field. Runs before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.encoded_image.trim().is_empty() {
            return Err(StudioError::Validation(
                "Please upload a photo of the garment first.".into(),
            ));
        }
        if self.content_type.trim().is_empty() {
            return Err(StudioError::Validation(
                "The garment image has no content type.".into(),
            ));
        }
        if self.brand_name.trim().is_empty() {
            return Err(StudioError::Validation(
                "Please enter a designer or brand name.".into(),
            ));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> PresentationPayload {
        PresentationPayload {
            base64_garment_data: Some(self.encoded_image.clone()),
            garment_mime_type: Some(self.content_type.clone()),
            brand_name: Some(self.brand_name.clone()),
            style: Some(self.style.label().to_string()),
            aspect_ratio: Some(self.aspect_ratio.as_str().to_string()),
        }
    }
}

/// Base64 image returned by the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub encoded_image: String,
}

/// JSON body of `POST /api/generateFashionPresentation`.
///
/// Every field is optional so the relay can answer a missing one with 400
/// instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_garment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garment_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

impl PresentationPayload {
    pub fn into_request(self) -> Result<GenerationRequest> {
        fn required(field: Option<String>) -> Result<String> {
            field.filter(|value| !value.trim().is_empty()).ok_or_else(|| {
                StudioError::Validation("Bad Request: Missing required parameters.".into())
            })
        }

        let encoded_image = required(self.base64_garment_data)?;
        let content_type = required(self.garment_mime_type)?;
        let brand_name = required(self.brand_name)?;
        let style = required(self.style)?;
        let aspect_ratio = required(self.aspect_ratio)?;

        Ok(GenerationRequest {
            encoded_image,
            content_type,
            brand_name,
            style: PresentationStyle::parse_or_default(&style),
            aspect_ratio: AspectRatio::parse(&aspect_ratio)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
