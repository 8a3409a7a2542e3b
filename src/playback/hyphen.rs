/// Joins words that were split across a line with a trailing hyphen.
///
/// A word ending in `-` is held back; the next word is appended to it and
/// the result is checked again, so chains like `co-` `op-` `eration`
/// collapse into one displayed word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HyphenJoiner {
    pending: Option<String>,
}

impl HyphenJoiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one word. Returns the word to display, if any.
    pub fn push(&mut self, word: &str) -> Option<String> {
        let word = match self.pending.take() {
            Some(mut fragment) => {
                fragment.push_str(word);
                fragment
            }
            None => word.to_string(),
        };

        if word.ends_with('-') {
            self.pending = Some(word);
            None
        } else {
            Some(word)
        }
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Drop the held fragment, returning it.
    pub fn clear(&mut self) -> Option<String> {
        self.pending.take()
    }
}
