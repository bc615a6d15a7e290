use crate::models::{AspectRatio, PresentationStyle};

/// Scene descriptions keyed by style. `MinimalistStudio` doubles as the
/// fallback for style strings that do not parse.
const SCENES: [(PresentationStyle, &str); 4] = [
    (
        PresentationStyle::MinimalistStudio,
        "a minimalist studio setting with a seamless, light grey background and professional, even lighting.",
    ),
    (
        PresentationStyle::OutdoorStreet,
        "an elegant street style setting in Dakar, with beautiful, natural morning light.",
    ),
    (
        PresentationStyle::LuxuryBoutique,
        "a high-end, luxurious boutique interior with soft, sophisticated lighting and minimalist decor.",
    ),
    (
        PresentationStyle::Mannequin,
        "a high-quality, abstract or headless mannequin in a clean, well-lit studio with a solid light-grey background. The focus is entirely on the garment's fit and texture.",
    ),
];

pub fn scene_description(style: PresentationStyle) -> &'static str {
    SCENES
        .iter()
        .find(|(key, _)| *key == style)
        .map(|(_, scene)| *scene)
        .unwrap_or(SCENES[0].1)
}

/// Scene for a raw style string, with the minimalist studio as the default.
pub fn scene_for_label(style: &str) -> &'static str {
    scene_description(PresentationStyle::parse_or_default(style))
}

fn model_description(style: PresentationStyle) -> &'static str {
    match style {
        PresentationStyle::Mannequin => {
            "Use a mannequin instead of a person, captured in a full-body view. \
             The mannequin should present the garment's fit and drape effectively."
        }
        _ => {
            "The model should be a dark-skinned Senegalese woman, exuding confidence and elegance. \
             Her pose should be natural and showcase the garment's fit and drape effectively. \
             The model must be captured in a full-body shot, from head to feet. \
             Her hair and makeup should be stylish yet understated, complementing the garment."
        }
    }
}

/// Full instruction sent alongside the garment image.
pub fn build_prompt(style: PresentationStyle, brand_name: &str, aspect_ratio: AspectRatio) -> String {
    format!(
        "As an expert fashion photographer, create a single, highly realistic, professional e-commerce fashion photograph.\n\
         \n\
         The subject is the garment from the provided image. If the garment is on a mannequin or is a flat-lay in the original image, place this exact garment onto a photorealistic human model.\n\
         \n\
         **Model:** {model}\n\
         \n\
         **Setting:** The setting is {scene}\n\
         \n\
         **Brand Aesthetic:** The overall mood should align with a modern, chic brand like '{brand}'.\n\
         \n\
         **Image Quality:** The final image must be of the highest quality, with sharp focus, realistic textures, and perfect lighting. \
         It must have a {ratio} {orientation} aspect ratio. \
         It should look like a shot from a high-end fashion magazine or a premium online store. \
         Do not include any text, logos, or watermarks. The final output should be just the image.",
        model = model_description(style),
        scene = scene_description(style),
        brand = brand_name.trim(),
        ratio = aspect_ratio.as_str(),
        orientation = aspect_ratio.orientation(),
    )
}
