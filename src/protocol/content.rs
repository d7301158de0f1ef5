use super::back::{BackContent, BackContentPart};
use super::front::{FrontContent, FrontContentBlock};

/// Convert Front message content into Back content.
///
/// Strings pass through; blocks map one-to-one, unknown blocks verbatim.
#[must_use]
pub fn convert_content(content: &FrontContent) -> BackContent {
    match content {
        FrontContent::Text(text) => BackContent::Text(text.clone()),
        FrontContent::Blocks(blocks) => BackContent::Parts(convert_blocks(blocks)),
    }
}

#[must_use]
pub fn convert_blocks(blocks: &[FrontContentBlock]) -> Vec<BackContentPart> {
    blocks.iter().map(convert_block).collect()
}

#[must_use]
pub fn convert_block(block: &FrontContentBlock) -> BackContentPart {
    match block {
        FrontContentBlock::Text { text } => BackContentPart::Text { text: text.clone() },
        FrontContentBlock::Image { media_type, data } => BackContentPart::ImageUrl {
            url: image_data_uri(media_type, data),
        },
        FrontContentBlock::Other(value) => BackContentPart::Passthrough(value.clone()),
    }
}

fn image_data_uri(media_type: &str, data: &str) -> String {
    let mut url = String::with_capacity(13 + media_type.len() + data.len());
    url.push_str("data:");
    url.push_str(media_type);
    url.push_str(";base64,");
    url.push_str(data);
    url
}
