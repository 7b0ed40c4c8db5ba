#[derive(Debug, Clone)]
pub struct EmailSubject(String);

impl EmailSubject {
    /// Returns an `EmailSubject` if the input is non-blank and a single line. Line breaks would let
    /// a subject smuggle extra headers into the message.
    pub fn parse(s: String) -> Result<EmailSubject, String> {
        if s.trim().is_empty() {
            return Err("The subject cannot be empty.".to_string());
        }
        if s.contains(['\r', '\n']) {
            return Err("The subject must fit on a single line.".to_string());
        }
        Ok(Self(s))
    }
}

impl AsRef<str> for EmailSubject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
