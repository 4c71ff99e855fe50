use anyhow::{Context, Result};
use regex::{Captures, Regex};

/// Marker the fine-tuned model sometimes leaves at the end of a reply.
const END_MARKER: &str = "<end>";

/// Chat-app emoji tags and the glyph each one becomes. Order matters:
/// when two tags match at the same position the earlier entry wins.
pub const EMOJI_TAGS: &[(&str, &str)] = &[
    ("[炸弹]", "💣"),
    ("[流泪]", "😭"),
    ("[大哭]", "😭"),
    ("[微笑]", "😊"),
    ("[调皮]", "😝"),
    ("[呲牙]", "😁"),
    ("[可爱]", "🥰"),
    ("[爱心]", "❤️"),
    ("[偷笑]", "😂"),
    ("[再见]", "👋"),
    ("[发呆]", "🤔"),
    ("[疑问]", "🤔"),
    ("[傲慢]", "😒"),
    ("[撇嘴]", "😒"),
    ("[鼓掌]", "👏"),
    ("[尴尬]", "😅"),
    ("[发怒]", "😠"),
    ("[奋斗]", "💪"),
    ("[惊恐]", "😱"),
    ("[恐惧]", "😱"),
    ("[惊讶]", "😮"),
    ("[酷]", "😎"),
    ("[愉快]", "😄"),
    ("[委屈]", "🥺"),
    ("[阴险]", "😏"),
    ("[赞]", "👍"),
    ("[猪头]", "🐷"),
    ("[抱拳]", "🙏"),
    ("[握手]", "🤝"),
];

/// ASCII and CJK punctuation/symbols that carry nothing worth speaking.
const PUNCTUATION_ONLY: &str =
    r#"^[\s.,，。!?？！:;：；"'“”‘’()（）\[\]【】{}<>《》\-_=+~～@#$%^&*°…′″‖|·・]*$"#;

/// Cleans model replies for display and decides whether they can be voiced.
pub struct ReplyFormatter {
    tags: Regex,
    punctuation_only: Regex,
}

impl ReplyFormatter {
    pub fn new() -> Result<Self> {
        let alternation = EMOJI_TAGS
            .iter()
            .map(|(tag, _)| regex::escape(tag))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            tags: Regex::new(&alternation).context("compiling emoji tag regex")?,
            punctuation_only: Regex::new(PUNCTUATION_ONLY)
                .context("compiling punctuation regex")?,
        })
    }

    /// Strip the end marker and swap emoji tags for glyphs in one pass.
    pub fn clean(&self, reply: &str) -> String {
        let stripped = reply.replace(END_MARKER, "");
        self.tags
            .replace_all(&stripped, |caps: &Captures| {
                let tag = &caps[0];
                EMOJI_TAGS
                    .iter()
                    .find(|(t, _)| *t == tag)
                    .map_or(tag, |(_, glyph)| *glyph)
                    .to_string()
            })
            .into_owned()
    }

    /// Whether a reply is worth sending to speech synthesis: it must not be
    /// blank, contain no emoji tag, and hold more than punctuation.
    pub fn is_speakable(&self, text: &str) -> bool {
        !text.trim().is_empty()
            && !self.tags.is_match(text)
            && !self.punctuation_only.is_match(text.trim())
    }
}
