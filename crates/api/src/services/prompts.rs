//! Prompt text and response schemas sent to the generative service.

use domain::models::place::parse_coords_query;
use domain::models::{Garment, GarmentCategory};
use serde::Serialize;
use serde_json::{json, Value};

/// Phase 1: put the garment (second image) on the person (first image).
pub fn dress_prompt(garment_category: &str) -> String {
    format!(
        "You are a professional fashion editor.
Input 1: A person.
Input 2: A {garment_category} garment.

Task: Generate a photo of the person from Input 1 wearing the garment from Input 2.
- Ensure the fit is realistic and tailored.
- PRESERVE the person's face and body identity exactly.
- Output ONLY the person on a simple white background.
- Do not crop the head or feet. Full body shot."
    )
}

/// Phase 2: compose the dressed members into one scene.
///
/// Image inputs are numbered in request order: the background first when
/// present, then one image per member.
pub fn composite_prompt(member_count: usize, has_background: bool, scene_context: &str) -> String {
    let mut inputs = String::new();
    let mut index = 1;
    if has_background {
        inputs.push_str(&format!("Input Image {}: BACKGROUND SCENE.\n", index));
        index += 1;
    }
    for model in 1..=member_count {
        inputs.push_str(&format!(
            "Input Image {}: Model {} (Reference Identity & Outfit).\n",
            index, model
        ));
        index += 1;
    }

    let models_from = if has_background { "2+" } else { "1+" };
    let canvas = if has_background {
        "Use Input 1 as the EXACT background canvas."
    } else {
        "Create a realistic background based on the description."
    };

    let mut prompt = format!(
        r#"You are a visionary digital compositor and photographer.
Task: Create a seamless, photorealistic composition.

{inputs}
Follow this "Chain of Thought" to generate the image:

1. **ANALYZE THE SCENE (Input 1):**
   - Look at the perspective (eye-level, drone, low angle?).
   - Understand the lighting (soft, harsh, neon, daylight?).
   - Identify physical geometry (stairs, walls, chairs, open street?).
   - **SCALE REFERENCE:** Identify known objects (doors, cars, chairs) to determine the correct scale for a human.

2. **INTEGRATE THE MODELS (Input {models_from}):**
   - **STRICT REQUIREMENT:** You MUST Preserve the facial identity of the Models exactly.
   - **POSE FREEDOM:** You are FREE to change the body pose of the models to fit the scene vibe.
     - **DO NOT just paste them standing straight.**
     - If it's a chill cafe, make them sit or lean on a table.
     - If it's a street, make them walk naturally or turn back.
     - If there's a wall, they can lean on it.
   - **SCALE & PLACEMENT:** Place the models on the *ground plane* correctly. Do not make them float or look giant/tiny. Use shadows to ground them.
   - **OUTFIT PRESERVATION:** Keep the clothing style and texture consistent with the input, but adjust folds/drape for the new pose.

3. **FINALIZE COMPOSITION:**
   - {canvas}
   - Match the shadows, color grading, and noise grain perfectly.
   - The final image should look like a high-end lifestyle photograph.
"#
    );

    if !scene_context.trim().is_empty() {
        prompt.push_str(&format!(
            "\nContext/Vibe of scene: \"{}\". Ensure the models' attitude matches this vibe.",
            scene_context
        ));
    }
    prompt.push_str("\nReturn ONLY the final composited image.");
    prompt
}

/// Place search prompt for free text or a `COORDS:` map click.
pub fn search_prompt(query: &str, place_id: Option<&str>) -> String {
    if let Some(coords) = parse_coords_query(query) {
        let place_line = place_id
            .map(|id| format!("Google Place ID: {}", id))
            .unwrap_or_default();
        return format!(
            "Context: User clicked a map point at coordinates {coords}. {place_line}
Task: Identify the specific place at this location.

Return a JSON array containing:
1. The exact place at this location (Name, Vibe, Description).
2. Up to 2 nearby recommended interesting spots (within 200m)."
        );
    }

    format!(
        r#"You are an expert Local Guide and Travel Concierge.
User Input: "{query}"

Task: Search for real-world locations based on the user's input. Return a JSON array.

Rules:
1. **EXACT ADDRESS/NAME MATCHING**: If the input looks like a specific address (e.g., "123 Main St") or a specific venue name (e.g., "The Note Coffee"), your FIRST result MUST be that exact place. Do not recommend generic "top places" instead.
2. **VIBE/CATEGORY SEARCH**: If the input is broad (e.g., "coffee", "cyberpunk streets"), recommend 3-4 top-rated, specific locations that fit the vibe.
3. **ACCURACY**: Ensure Latitude/Longitude are accurate for the specific place found.

Few-Shot Examples:

Example 1 (Specific Address):
Input: "64 P. Lương Văn Can, Hàng Trống, Hoàn Kiếm, Hà Nội"
Output: [{{"name": "The Note Coffee", "description": "Famous cafe covered in post-it notes with lake views, located exactly at this address.", "lat": 21.0326, "lng": 105.8528, "suggestedAttire": "Casual, colorful", "bestTime": "Morning", "tips": "Write a note!"}}]

Example 2 (Specific Name):
Input: "Eiffel Tower"
Output: [{{"name": "Eiffel Tower", "description": "Iconic iron lattice tower on the Champ de Mars.", "lat": 48.8584, "lng": 2.2945, "suggestedAttire": "Chic & Comfortable", "bestTime": "Sunset", "tips": "Book tickets in advance."}}]

Example 3 (Vibe Search):
Input: "Hidden Jazz Bars in Tokyo"
Output: [
   {{"name": "Bar Trench", "description": "Sophisticated craft cocktails and jazz.", "lat": 35.6486, "lng": 139.7066, "suggestedAttire": "Smart Casual", "bestTime": "Evening", "tips": "Try the absinthe."}},
   {{"name": "Blue Note Tokyo", "description": "Famous upscale jazz club.", "lat": 35.6607, "lng": 139.7153, "suggestedAttire": "Formal", "bestTime": "Night", "tips": "Check schedule."}}
]

Analyze the User Input and generate the JSON response."#
    )
}

/// Garment classification prompt.
pub fn analyze_prompt(hint: Option<&str>) -> String {
    let hint_line = hint
        .filter(|h| !h.trim().is_empty())
        .map(|h| format!("User Hint: \"{}\".", h))
        .unwrap_or_default();

    format!(
        r#"You are a professional fashion stylist. Analyze the clothing item shown in the image.

Rules:
1. Identify the 'category' from this list: Tops, Bottoms, Outerwear, Shoes, Accessories. (Do not use 'All').
2. Identify the dominant 'color'.
3. Generate 3 descriptive 'tags' (e.g., material, style, occasion).

Few-shot Examples:
- Input: Blue Denim Jeans
- Output: {{ "category": "Bottoms", "color": "Blue", "tags": ["Denim", "Casual", "Streetwear"] }}

- Input: Black Leather Jacket
- Output: {{ "category": "Outerwear", "color": "Black", "tags": ["Leather", "Biker", "Winter"] }}

- Input: Red Silk Scarf
- Output: {{ "category": "Accessories", "color": "Red", "tags": ["Silk", "Elegant", "Patterned"] }}

{hint_line}

Analyze the provided image and return the JSON object conforming to the schema."#
    )
}

#[derive(Serialize)]
struct ClosetSummaryItem<'a> {
    id: &'a str,
    name: &'a str,
    category: GarmentCategory,
    color: Option<&'a str>,
    tags: Option<&'a [String]>,
}

/// Outfit recommendation prompt. Image data is left out of the closet summary.
pub fn recommend_prompt(place_description: &str, closet: &[Garment]) -> String {
    let summary: Vec<ClosetSummaryItem<'_>> = closet
        .iter()
        .map(|g| ClosetSummaryItem {
            id: &g.id,
            name: &g.name,
            category: g.category,
            color: g.color.as_deref(),
            tags: g.tags.as_deref(),
        })
        .collect();
    let closet_json = serde_json::to_string(&summary).unwrap_or_else(|_| "[]".to_string());

    format!(
        "I am going to a place with this vibe: \"{}\". Here is my closet: {}. Select the top 3 items. Return ONLY a JSON array of \"id\" strings.",
        place_description, closet_json
    )
}

/// Member portrait regeneration prompt.
pub fn base_model_prompt(instructions: Option<&str>) -> String {
    let pose = match instructions.filter(|i| !i.trim().is_empty()) {
        Some(custom) => format!("Custom pose: {}", custom),
        None => "Pose: Full frontal, confident standing.".to_string(),
    };
    format!(
        "You are an expert fashion photographer AI. Task: Regenerate this person into a professional full-body model standing pose. Instructions: Retain the person's exact face, hair, and body type. {} Clean studio background. High quality. Return ONLY the image.",
        pose
    )
}

/// Response schema for place search.
pub fn place_list_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "description": { "type": "STRING" },
                "lat": { "type": "NUMBER" },
                "lng": { "type": "NUMBER" },
                "suggestedAttire": { "type": "STRING" },
                "bestTime": { "type": "STRING" },
                "tips": { "type": "STRING" }
            },
            "required": ["name", "description", "lat", "lng", "suggestedAttire", "bestTime", "tips"]
        }
    })
}

/// Response schema for garment classification.
pub fn garment_analysis_schema() -> Value {
    let categories: Vec<&str> = GarmentCategory::ALL.iter().map(|c| c.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "category": { "type": "STRING", "enum": categories },
            "color": { "type": "STRING" },
            "tags": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["category", "color", "tags"]
    })
}

/// Response schema for a list of garment ids.
pub fn id_list_schema() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_dress_prompt_names_category() {
        let prompt = dress_prompt("Outerwear");
        assert!(prompt.contains("Input 2: A Outerwear garment."));
        assert!(prompt.contains("Full body shot."));
    }

    #[test]
    fn test_composite_prompt_numbers_inputs_with_background() {
        let prompt = composite_prompt(2, true, "Rooftop bar at dusk");
        assert!(prompt.contains("Input Image 1: BACKGROUND SCENE."));
        assert!(prompt.contains("Input Image 2: Model 1 (Reference Identity & Outfit)."));
        assert!(prompt.contains("Input Image 3: Model 2 (Reference Identity & Outfit)."));
        assert!(prompt.contains("(Input 2+)"));
        assert!(prompt.contains("Use Input 1 as the EXACT background canvas."));
        assert!(prompt.contains("Context/Vibe of scene: \"Rooftop bar at dusk\"."));
        assert!(prompt.ends_with("Return ONLY the final composited image."));
    }

    #[test]
    fn test_composite_prompt_without_background_or_context() {
        let prompt = composite_prompt(1, false, "");
        assert!(!prompt.contains("BACKGROUND SCENE"));
        assert!(prompt.contains("Input Image 1: Model 1"));
        assert!(prompt.contains("(Input 1+)"));
        assert!(prompt.contains("Create a realistic background based on the description."));
        assert!(!prompt.contains("Context/Vibe"));
    }

    #[test]
    fn test_search_prompt_coordinates() {
        let prompt = search_prompt("COORDS:21.03,105.85", Some("ChIJ123"));
        assert!(prompt.contains("coordinates 21.03,105.85."));
        assert!(prompt.contains("Google Place ID: ChIJ123"));
        assert!(prompt.contains("within 200m"));
    }

    #[test]
    fn test_search_prompt_free_text() {
        let prompt = search_prompt("Cafe in Hanoi", None);
        assert!(prompt.contains("User Input: \"Cafe in Hanoi\""));
        assert!(prompt.contains("\"name\": \"Eiffel Tower\""));
    }

    #[test]
    fn test_analyze_prompt_hint() {
        assert!(analyze_prompt(Some("linen shirt")).contains("User Hint: \"linen shirt\"."));
        assert!(!analyze_prompt(None).contains("User Hint"));
    }

    #[test]
    fn test_recommend_prompt_omits_image_data() {
        let garment = Garment {
            id: "c1".to_string(),
            name: "Linen shirt".to_string(),
            category: GarmentCategory::Tops,
            image_data: "data:image/png;base64,SECRET".to_string(),
            color: Some("White".to_string()),
            tags: Some(vec!["Linen".to_string()]),
            created_at: Utc::now(),
        };
        let prompt = recommend_prompt("Beach club", &[garment]);
        assert!(prompt.contains(r#""id":"c1""#));
        assert!(prompt.contains(r#""category":"Tops""#));
        assert!(!prompt.contains("SECRET"));
    }

    #[test]
    fn test_base_model_prompt_pose() {
        assert!(base_model_prompt(Some("Sitting on a stool")).contains("Custom pose: Sitting on a stool"));
        assert!(base_model_prompt(None).contains("Full frontal, confident standing."));
    }

    #[test]
    fn test_analysis_schema_excludes_all() {
        let schema = garment_analysis_schema();
        let categories = schema["properties"]["category"]["enum"].as_array().unwrap();
        assert_eq!(categories.len(), 5);
        assert!(!categories.iter().any(|c| c == "All"));
    }
}
