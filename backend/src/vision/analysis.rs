use log::info;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use shared::{ActionSteps, Disclaimer, ProductSource, Status, StatusType, UiContent};

use super::client::{ChatMessage, ContentPart, VisionClient, VisionError};
use crate::intake::UploadedImage;

pub const UNKNOWN_NAME: &str = "Unknown Product";
pub const UNKNOWN_BRAND: &str = "Unknown Brand";
pub const UNKNOWN_CATEGORY: &str = "Uncategorized";
pub const UNKNOWN_DESCRIPTION: &str = "No description available";
pub const EMPTY_QUERY_PLACEHOLDER: &str = "unknown";

const DEFAULT_STATUS_MESSAGE: &str = "Product identified from the uploaded image.";
const DEFAULT_DETAILS_TITLE: &str = "Product Details";
const DEFAULT_NUTRITION_TITLE: &str = "Nutrition Facts";
pub const DEFAULT_DISCLAIMER: &str = "This information was generated by AI and may contain errors or \
inaccuracies. Verify it against the product packaging and official sources before relying on it. \
This is an experimental tool and should not be your only source of information.";

const ANALYSIS_PROMPT: &str = r#"Analyze the product image and provide information in JSON format with the following structure:
{
  "product": {
    "name": string,
    "brand": string,
    "category": string,
    "description": string
  },
  "ui_content": {
    "status": {
      "message": string,
      "type": "success" | "info" | "warning"
    },
    "details_title": string,
    "nutrition_title": string,
    "disclaimer": {
      "message": string,
      "source": "catalog" | "AI",
      "action_steps": {
        "brand_url": string | null,
        "shopping_links": string[] | null,
        "additional_info": string | null
      }
    }
  }
}

CRITICAL REQUIREMENTS:
1. The disclaimer message MUST always warn that:
   - AI-generated content may contain errors or inaccuracies
   - Users should verify information with the product packaging
   - This is an experimental tool and should not be the sole source of information
   - Official sources should be consulted for critical information

2. Status type should be:
   - "success" when nutritional info is available
   - "info" when the product is identified but no nutritional info is known
   - "warning" when the product cannot be identified with confidence

3. For action_steps, provide:
   - The official brand website, preferring the brand's regional domain
   - Major online stores that likely sell this product
   - Additional verification steps users can take

Be concise but clear in all messages, prioritizing user safety and awareness of AI limitations."#;

const ANALYSIS_INSTRUCTION: &str = "Analyze this product and provide detailed information.";

#[derive(Debug, Clone, PartialEq)]
pub struct AiProduct {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
}

impl Default for AiProduct {
    fn default() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            brand: UNKNOWN_BRAND.to_string(),
            category: UNKNOWN_CATEGORY.to_string(),
            description: UNKNOWN_DESCRIPTION.to_string(),
        }
    }
}

impl AiProduct {
    /// Brand and name joined for a catalog search. Unknown parts are left out.
    pub fn search_query(&self) -> String {
        let query = [
            (self.brand.as_str(), UNKNOWN_BRAND),
            (self.name.as_str(), UNKNOWN_NAME),
        ]
        .iter()
        .map(|(value, sentinel)| (value.trim(), *sentinel))
        .filter(|(value, sentinel)| !value.is_empty() && value != sentinel)
        .map(|(value, _)| value)
        .collect::<Vec<_>>()
        .join(" ");

        if query.is_empty() {
            EMPTY_QUERY_PLACEHOLDER.to_string()
        } else {
            query
        }
    }
}

/// The vision model's guess, with every optional field already defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct AiAnalysis {
    pub product: AiProduct,
    pub ui_content: UiContent,
}

impl Default for AiAnalysis {
    fn default() -> Self {
        RawAnalysis::default().normalize(RawProduct::default())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnalysis {
    product: Option<RawProduct>,
    ui_content: Option<RawUiContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProduct {
    name: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUiContent {
    status: Option<RawStatus>,
    details_title: Option<String>,
    nutrition_title: Option<String>,
    disclaimer: Option<RawDisclaimer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStatus {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDisclaimer {
    message: Option<String>,
    source: Option<String>,
    action_steps: Option<RawActionSteps>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawActionSteps {
    brand_url: Option<String>,
    #[serde(deserialize_with = "deserialize_links")]
    shopping_links: Option<Vec<String>>,
    additional_info: Option<String>,
}

// Models sometimes return a single link as a bare string.
fn deserialize_links<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let links: Vec<String> = match value {
        Value::String(link) => vec![link],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    let links: Vec<String> = links
        .into_iter()
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
        .collect();
    Ok((!links.is_empty()).then_some(links))
}

fn text_or(value: Option<String>, fallback: &str) -> String {
    non_blank(value).unwrap_or_else(|| fallback.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RawAnalysis {
    fn normalize(self, product: RawProduct) -> AiAnalysis {
        let ui = self.ui_content.unwrap_or_default();
        let status = ui.status.unwrap_or_default();
        let disclaimer = ui.disclaimer.unwrap_or_default();
        let steps = disclaimer.action_steps.unwrap_or_default();

        AiAnalysis {
            product: AiProduct {
                name: text_or(product.name, UNKNOWN_NAME),
                brand: text_or(product.brand, UNKNOWN_BRAND),
                category: text_or(product.category, UNKNOWN_CATEGORY),
                description: text_or(product.description, UNKNOWN_DESCRIPTION),
            },
            ui_content: UiContent {
                status: Status {
                    message: text_or(status.message, DEFAULT_STATUS_MESSAGE),
                    kind: status
                        .kind
                        .and_then(|kind| kind.trim().parse::<StatusType>().ok())
                        .unwrap_or_default(),
                },
                details_title: text_or(ui.details_title, DEFAULT_DETAILS_TITLE),
                nutrition_title: text_or(ui.nutrition_title, DEFAULT_NUTRITION_TITLE),
                disclaimer: Disclaimer {
                    message: text_or(disclaimer.message, DEFAULT_DISCLAIMER),
                    source: disclaimer
                        .source
                        .and_then(|source| source.trim().parse::<ProductSource>().ok())
                        .unwrap_or_default(),
                    action_steps: ActionSteps {
                        brand_url: non_blank(steps.brand_url),
                        shopping_links: steps.shopping_links,
                        additional_info: non_blank(steps.additional_info),
                    },
                },
            },
        }
    }
}

// Tolerates fenced code blocks or prose around the JSON object.
fn extract_json(reply: &str) -> &str {
    let trimmed = reply.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

pub fn parse_analysis(reply: &str) -> Result<AiAnalysis, VisionError> {
    let mut raw: RawAnalysis = serde_json::from_str(extract_json(reply))?;
    let product = raw
        .product
        .take()
        .ok_or_else(|| VisionError::IncompleteAnalysis("reply has no product".to_string()))?;
    Ok(raw.normalize(product))
}

impl VisionClient {
    pub async fn analyze_product(&self, image: &UploadedImage) -> Result<AiAnalysis, VisionError> {
        let request = self.request(
            vec![
                ChatMessage::system(ANALYSIS_PROMPT),
                ChatMessage::user(vec![
                    ContentPart::text(ANALYSIS_INSTRUCTION),
                    ContentPart::image(image.data_url()),
                ]),
            ],
            self.analysis_max_tokens,
            true,
        );

        let reply = self.complete(&request).await?;
        let analysis = parse_analysis(&reply)?;
        info!(
            "Vision model identified '{}' by '{}'",
            analysis.product.name, analysis.product.brand
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::client::tests::{chat_reply, test_config};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn missing_product_is_incomplete() {
        let err = parse_analysis(r#"{"ui_content": {"status": {"type": "info"}}}"#).unwrap_err();
        assert!(matches!(err, VisionError::IncompleteAnalysis(_)));

        let err = parse_analysis(r#"{"product": null}"#).unwrap_err();
        assert!(matches!(err, VisionError::IncompleteAnalysis(_)));
    }

    #[test]
    fn non_json_reply_is_an_error() {
        assert!(matches!(
            parse_analysis("I cannot identify this product."),
            Err(VisionError::JsonError(_))
        ));
    }

    #[test]
    fn omitted_fields_get_sentinels() {
        let analysis =
            parse_analysis(r#"{"product": {"name": "Choco Bar", "brand": "  "}}"#).unwrap();

        assert_eq!(analysis.product.name, "Choco Bar");
        assert_eq!(analysis.product.brand, UNKNOWN_BRAND);
        assert_eq!(analysis.product.category, UNKNOWN_CATEGORY);
        assert_eq!(analysis.product.description, UNKNOWN_DESCRIPTION);
        assert_eq!(analysis.ui_content.status.kind, StatusType::Info);
        assert_eq!(analysis.ui_content.disclaimer.message, DEFAULT_DISCLAIMER);
        assert_eq!(analysis.ui_content.disclaimer.source, ProductSource::Ai);
        assert_eq!(analysis.ui_content.disclaimer.action_steps, ActionSteps::default());
        assert_eq!(analysis.ui_content.details_title, DEFAULT_DETAILS_TITLE);
    }

    #[test]
    fn fenced_reply_is_accepted() {
        let reply = "```json\n{\"product\": {\"name\": \"Choco Bar\", \"brand\": \"Acme\"}, \
            \"ui_content\": {\"status\": {\"type\": \"SUCCESS\", \"message\": \"Found it\"}, \
            \"disclaimer\": {\"source\": \"OpenFoodFacts\", \"action_steps\": \
            {\"shopping_links\": \"https://shop.example/choco\"}}}}\n```";
        let analysis = parse_analysis(reply).unwrap();

        assert_eq!(analysis.product.brand, "Acme");
        assert_eq!(analysis.ui_content.status.kind, StatusType::Success);
        assert_eq!(analysis.ui_content.status.message, "Found it");
        assert_eq!(analysis.ui_content.disclaimer.source, ProductSource::Catalog);
        assert_eq!(
            analysis.ui_content.disclaimer.action_steps.shopping_links,
            Some(vec!["https://shop.example/choco".to_string()])
        );
    }

    #[test]
    fn unknown_status_type_falls_back_to_info() {
        let reply = r#"{"product": {}, "ui_content": {"status": {"type": "error"}}}"#;
        let analysis = parse_analysis(reply).unwrap();
        assert_eq!(analysis.ui_content.status.kind, StatusType::Info);
        assert_eq!(analysis.product, AiProduct::default());
    }

    #[test]
    fn search_query_joins_brand_and_name() {
        let product = AiProduct {
            name: " Choco Bar ".into(),
            brand: "Acme".into(),
            ..AiProduct::default()
        };
        assert_eq!(product.search_query(), "Acme Choco Bar");

        let product = AiProduct {
            name: "Choco Bar".into(),
            ..AiProduct::default()
        };
        assert_eq!(product.search_query(), "Choco Bar");
    }

    #[test]
    fn empty_guess_searches_for_placeholder() {
        assert_eq!(AiProduct::default().search_query(), EMPTY_QUERY_PLACEHOLDER);
    }

    #[tokio::test]
    async fn analyze_product_sends_inline_image() {
        let server = MockServer::start().await;
        let image = UploadedImage::new(b"abc".to_vec(), Some("image/jpeg"), None).unwrap();

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 800,
                "response_format": { "type": "json_object" }
            })))
            .and(body_string_contains("data:image/jpeg;base64,YWJj"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
                r#"{"product": {"name": "Choco Bar", "brand": "Acme"}}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = VisionClient::new(&test_config(&server.uri())).unwrap();
        let analysis = client.analyze_product(&image).await.unwrap();
        assert_eq!(analysis.product.search_query(), "Acme Choco Bar");
    }
}
