/// Per-interaction address-bar state
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Interactions started so far
    interaction: u64,

    /// Last text typed after the keyword in this interaction
    raw_input: Option<String>,
}

impl Session {
    /// Begin a new interaction, forgetting the previous input
    pub fn start(&mut self) {
        self.interaction += 1;
        self.raw_input = None;
    }

    pub fn record_input(&mut self, text: String) {
        self.raw_input = Some(text);
    }

    #[must_use]
    pub fn interaction(&self) -> u64 {
        self.interaction
    }

    /// Whether a committed `url` is the address bar's default entry, which
    /// echoes the raw input instead of carrying a real target
    #[must_use]
    pub fn is_default_entry(&self, url: &str) -> bool {
        self.raw_input.as_deref() == Some(url)
    }
}
