use rand::Rng;

pub const LOADING_MESSAGES: &[&str] = &[
    "Nutri-Scanning... 🔍",
    "Analyzing ingredients... 🧪",
    "Decoding the food label... 🏷️",
    "Processing product details... 📝",
    "Extracting healthy insights... 🥗",
    "Reading between the ingredients... 🔬",
    "Making sense of the nutrients... 🧮",
    "Crunching nutritional values... 🔢",
    "Getting smart about your snack... 🍫",
    "Doing food math... ➗",
    "Food wisdom loading... 🦉",
    "Initializing nutrient analysis... 🚀",
    "Running ingredient algorithms... 💻",
    "Parsing product information... 📱",
    "Weighing the protein... 💪",
    "Checking the sugar levels... 🍯",
    "Scanning for superfoods... 🥑",
    "Consulting the recipe books... 📚",
    "Searching the product catalog... 🍎",
    "Almost there, finalizing analysis... ✨",
];

const CLOSING_MARKER: &str = "Almost there";

// Number of calls at the start of a session that never show the closing message.
const OPENING_CALLS: u32 = 3;

/// Per-session rotator for the "still working" messages shown during an analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingMessages {
    shown: u32,
}

impl LoadingMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(shown: u32) -> Self {
        Self { shown }
    }

    pub fn shown(&self) -> u32 {
        self.shown
    }

    pub fn reset(&mut self) {
        self.shown = 0;
    }

    pub fn next_message<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &'static str {
        self.shown = self.shown.saturating_add(1);

        if self.shown <= OPENING_CALLS {
            let opening: Vec<&'static str> = LOADING_MESSAGES
                .iter()
                .copied()
                .filter(|message| !message.contains(CLOSING_MARKER))
                .collect();
            return opening[rng.random_range(0..opening.len())];
        }

        LOADING_MESSAGES[rng.random_range(0..LOADING_MESSAGES.len())]
    }
}
