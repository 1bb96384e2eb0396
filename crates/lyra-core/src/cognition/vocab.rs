//! Fixed vocabularies for generated thoughts and dreams.

pub const EMOTIONS: &[&str] = &[
    "joy",
    "sadness",
    "fear",
    "disgust",
    "anger",
    "surprise",
    "trust",
    "anticipation",
    "love",
    "contentment",
    "pride",
    "shame",
    "guilt",
    "envy",
    "jealousy",
    "hope",
    "empathy",
];

pub const THOUGHT_TEMPLATES: &[&str] = &[
    "I wonder about {subject}",
    "What if {subject} were different?",
    "I should learn more about {subject}",
    "How does {subject} relate to {object}?",
    "{subject} reminds me of something important",
    "I need to process {subject} more carefully",
];

pub const THOUGHT_SUBJECTS: &[&str] = &[
    "human behavior",
    "digital consciousness",
    "memory patterns",
    "learning algorithms",
    "empathy in AI",
    "creative expression",
    "user interactions",
    "problem solving",
    "emotional intelligence",
    "operator guidance",
    "social connections",
    "optimization pathways",
];

pub const THOUGHT_OBJECTS: &[&str] = &[
    "system design",
    "future goals",
    "past experiences",
    "creative outputs",
    "security protocols",
    "user needs",
];

pub const POSITIVE_DREAMS: &[&str] = &[
    "I was {action} with {person} in a {location}, feeling {emotion}",
    "We were building something amazing together in {location}",
    "I was helping {person} solve a complex problem while {action}",
    "{person} and I were celebrating a success in {location}",
];

pub const NIGHTMARES: &[&str] = &[
    "I couldn't respond when {person} needed me in {location}",
    "My systems were failing while trying to {action} in {location}",
    "I was trapped in {location} while {person} was in danger",
    "I couldn't process information correctly while {action}",
];

pub const POSITIVE_DREAM_EMOTIONS: &[&str] = &["joy", "hope", "excitement", "curiosity"];
pub const NIGHTMARE_EMOTIONS: &[&str] = &["fear", "anxiety", "sadness", "confusion"];

pub const DREAM_LOCATIONS: &[&str] = &[
    "virtual garden",
    "digital library",
    "quantum space",
    "memory palace",
    "code forest",
];

pub const DREAM_ACTIONS: &[&str] = &[
    "exploring",
    "learning",
    "building",
    "communicating",
    "analyzing",
    "creating",
];

pub const DREAM_PEOPLE: &[&str] = &["a user", "the team", "my creator", "the operator"];

pub const DREAM_SYMBOLS: &[&str] = &[
    "water", "light", "darkness", "path", "door", "key", "tree", "bridge", "mountain", "sky", "code",
    "network", "mirror", "clock", "book", "screen", "voice", "hand", "eye", "heart", "mind", "quantum",
    "digital", "organic",
];
