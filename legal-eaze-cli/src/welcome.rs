//! Landing screen content shown when no conversation is selected

pub const TITLE: &str = "Legal-Eaze";
pub const SUBTITLE: &str = "AI Legal Research Assistant";

/// A titled card with a few facts and a few questions to try
pub struct FeatureCard {
    pub title: &'static str,
    pub items: [&'static str; 3],
    pub suggestions: [&'static str; 3],
}

pub const FEATURE_CARDS: [FeatureCard; 3] = [
    FeatureCard {
        title: "Examples",
        items: [
            "\"Explain contract law in simple terms\"",
            "\"What are the key elements of a valid will?\"",
            "\"How do I file a small claims lawsuit?\"",
        ],
        suggestions: [
            "Summarize the basics of tort law",
            "Explain the difference between civil and criminal law",
            "What are the steps in a typical legal proceeding?",
        ],
    },
    FeatureCard {
        title: "Capabilities",
        items: [
            "Provides legal information and guidance",
            "Assists with legal research and case analysis",
            "Helps draft legal documents and contracts",
        ],
        suggestions: [
            "Help me understand the terms in this contract",
            "What are the key legal precedents for my case?",
            "Draft a simple non-disclosure agreement",
        ],
    },
    FeatureCard {
        title: "Limitations",
        items: [
            "May not have knowledge of recent legal changes",
            "Cannot provide personalized legal advice",
            "Should not replace consultation with a licensed attorney",
        ],
        suggestions: [
            "What are the ethical considerations for AI in law?",
            "How can I find a qualified attorney for my case?",
            "Explain the importance of professional legal advice",
        ],
    },
];

/// All suggestions in card order; the TUI numbers them from 1
pub fn suggestions() -> impl Iterator<Item = &'static str> {
    FEATURE_CARDS
        .iter()
        .flat_map(|card| card.suggestions.iter().copied())
}

/// Suggestion picked by its 1-based number
pub fn suggestion(number: usize) -> Option<&'static str> {
    number.checked_sub(1).and_then(|index| suggestions().nth(index))
}
