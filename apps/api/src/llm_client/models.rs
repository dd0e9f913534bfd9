//! Candidate model lists. Earlier entries are preferred; the resolver probes them in order.

/// Fast list: flash models first, they carry better rate limits for question generation.
const FAST_MODEL_IDS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-1.5-flash",
    "{override}",
    "gemini-2.5-pro",
    "gemini-pro",
];

/// Default list: pro models first, used for answer review.
const DEFAULT_MODEL_IDS: &[&str] = &[
    "{override}",
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-2.0-pro-exp",
    "gemini-1.5-pro",
    "gemini-1.5-flash",
    "gemini-pro",
];

const OVERRIDE_SLOT: &str = "{override}";

/// Which candidate list a call should be served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Default,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Fast => "fast",
            ModelTier::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelCandidates {
    pub fast: Vec<String>,
    pub default: Vec<String>,
}

impl ModelCandidates {
    /// `fast_list` / `default_list` are comma-separated replacements for the built-in lists.
    /// `model_override` fills the override slot of the built-in lists only.
    pub fn new(
        model_override: Option<&str>,
        fast_list: Option<&str>,
        default_list: Option<&str>,
    ) -> Self {
        let fast = match fast_list {
            Some(raw) => split_list(raw),
            None => with_override(FAST_MODEL_IDS, model_override),
        };
        let default = match default_list {
            Some(raw) => split_list(raw),
            None => with_override(DEFAULT_MODEL_IDS, model_override),
        };
        Self { fast, default }
    }

    /// Test and tooling constructor for explicit lists.
    pub fn from_lists<I, S>(fast: I, default: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fast: clean(fast.into_iter().map(Into::into)),
            default: clean(default.into_iter().map(Into::into)),
        }
    }

    pub fn for_tier(&self, tier: ModelTier) -> &[String] {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Default => &self.default,
        }
    }
}

fn with_override(ids: &[&str], model_override: Option<&str>) -> Vec<String> {
    clean(ids.iter().map(|id| {
        if *id == OVERRIDE_SLOT {
            model_override.unwrap_or_default().to_string()
        } else {
            id.to_string()
        }
    }))
}

fn split_list(raw: &str) -> Vec<String> {
    clean(raw.split(',').map(String::from))
}

/// Drops blank entries and repeats, keeping the first occurrence.
fn clean(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        let id = id.trim().to_string();
        if !id.is_empty() && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
