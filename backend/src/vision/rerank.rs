use log::{debug, info, warn};

use super::client::{ChatMessage, ContentPart, VisionClient};
use crate::catalog::CatalogProduct;
use crate::intake::UploadedImage;

const RERANK_PROMPT: &str = "Compare the uploaded product image with the database product images. \
Return the index (0-based) of the most visually similar product. Consider packaging design, colors, \
and overall appearance. Products can look alike yet differ in variety or flavor, so compare carefully. \
Return only the number.";

/// Reads a leading integer the way the model tends to write it ("2", " 2.", "2\n").
pub fn parse_index(reply: &str, len: usize) -> Option<usize> {
    let digits: String = reply
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse::<usize>().ok().filter(|index| *index < len)
}

impl VisionClient {
    /// Asks the model which candidate image best matches the upload. `None` on
    /// any failure or unusable reply.
    pub async fn most_similar(
        &self,
        image: &UploadedImage,
        candidate_urls: &[&str],
    ) -> Option<usize> {
        if candidate_urls.is_empty() {
            return None;
        }

        let mut parts = vec![
            ContentPart::text(format!(
                "Which of these database product images (numbered 0 to {}) most closely matches the uploaded product image?",
                candidate_urls.len() - 1
            )),
            ContentPart::image(image.data_url()),
        ];
        parts.extend(candidate_urls.iter().map(|url| ContentPart::image(*url)));

        let request = self.request(
            vec![ChatMessage::system(RERANK_PROMPT), ChatMessage::user(parts)],
            self.rerank_max_tokens,
            false,
        );

        match self.complete(&request).await {
            Ok(reply) => {
                let index = parse_index(&reply, candidate_urls.len());
                if index.is_none() {
                    warn!("Unusable re-ranking reply: {:?}", reply);
                }
                index
            }
            Err(e) => {
                warn!("Re-ranking request failed: {}", e);
                None
            }
        }
    }
}

/// Picks the candidate that looks most like the upload. Falls back to the
/// first candidate whenever a visual comparison is impossible or fails.
pub async fn select_best_match<'a>(
    vision: &VisionClient,
    image: &UploadedImage,
    candidates: &'a [CatalogProduct],
) -> Option<&'a CatalogProduct> {
    let first = candidates.first()?;
    if candidates.len() == 1 {
        return Some(first);
    }

    let with_images: Vec<(&CatalogProduct, &str)> = candidates
        .iter()
        .filter_map(|product| product.image_url.as_deref().map(|url| (product, url)))
        .collect();
    if with_images.is_empty() {
        debug!("No candidate has an image, keeping the first of {}", candidates.len());
        return Some(first);
    }

    let urls: Vec<&str> = with_images.iter().map(|(_, url)| *url).collect();
    let chosen = vision
        .most_similar(image, &urls)
        .await
        .and_then(|index| with_images.get(index))
        .map(|(product, _)| *product);

    match chosen {
        Some(product) => {
            info!(
                "Re-ranking chose '{}' among {} candidates",
                product.product_name.as_deref().unwrap_or("?"),
                with_images.len()
            );
            Some(product)
        }
        None => Some(first),
    }
}
