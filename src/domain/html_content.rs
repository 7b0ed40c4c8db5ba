#[derive(Debug, Clone)]
pub struct HtmlContent(String);

impl HtmlContent {
    pub fn parse(s: String) -> Result<HtmlContent, String> {
        if s.trim().is_empty() {
            Err("The HTML content cannot be empty.".to_string())
        } else {
            Ok(Self(s))
        }
    }
}

impl AsRef<str> for HtmlContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
