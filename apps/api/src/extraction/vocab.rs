//! Canonical vocabularies, alias tables, and the default attribute record.
//!
//! Pure data. Every enum field resolves through `Field::resolve`, which
//! lowercases, applies the field's alias table, then tests membership.
//! Alias tables are closed: every target is canonical for its field and no
//! key is itself canonical, so resolution is idempotent.

use crate::extraction::models::{
    AttributeRecord, Category, Color, Fit, Material, Meta, Pattern, Scores,
};

/// The literal accepted by every enum field in addition to its vocabulary.
pub const UNKNOWN: &str = "unknown";

/// The exact top-level key set of a wire-format attribute record.
pub const REQUIRED_TOP_KEYS: [&str; 13] = [
    "category",
    "closure",
    "color",
    "confidence",
    "fit",
    "length",
    "material",
    "meta",
    "neckline",
    "pattern",
    "scores",
    "sleeve",
    "style_tags",
];

pub const MAX_SECONDARY_COLORS: usize = 3;
pub const MAX_CLOSURES: usize = 3;
pub const MAX_STYLE_TAGS: usize = 8;
pub const MAX_SEASONS: usize = 4;

const CATEGORY_MAIN: &[&str] = &["outer", "top", "bottom", "onepiece", "shoes", "accessory"];

const CATEGORY_SUB: &[&str] = &[
    "coat", "puffer", "jacket", "blazer", "cardigan", "hoodie", "sweatshirt", "blouses", "shirt",
    "tshirt", "knit", "sweater", "slacks", "jeans", "shorts", "skirt", "dress", "sneakers",
    "loafers", "heels", "boots", "camisoles", "bag", "cap", "hat", "scarf", "belt", "other",
];

const COLOR: &[&str] = &[
    "black", "white", "gray", "navy", "blue", "skyblue", "beige", "brown", "khaki", "green", "red",
    "pink", "purple", "yellow", "orange", "cream", "charcoal", "ivory", "camel", "olive", "wine",
    "mint", "silver", "gold", "lavender", "mustard", "denim", "indigo", "other",
];

const TONE: &[&str] = &[
    "light", "dark", "muted", "vivid", "pastel", "deep", "neon", "neutral", "other",
];

const PATTERN: &[&str] = &[
    "solid",
    "stripe",
    "check",
    "houndstooth",
    "dot",
    "floral",
    "animal",
    "argyle",
    "graphic",
    "camo",
    "other",
];

const MATERIAL: &[&str] = &[
    "cotton", "denim", "knit", "wool", "leather", "suede", "poly", "linen", "silk", "corduroy",
    "fleece", "velvet", "chiffon", "other",
];

const FIT: &[&str] = &[
    "tight", "slim", "regular", "loose", "oversized", "a-line", "flare", "wide", "other",
];

const NECKLINE: &[&str] = &[
    "crew",
    "vneck",
    "u-neck",
    "collar",
    "turtleneck",
    "mock-neck",
    "square",
    "off-shoulder",
    "boat-neck",
    "hood",
    "other",
];

const SLEEVE: &[&str] = &["sleeveless", "cap", "short", "half", "long", "other"];

const LENGTH: &[&str] = &[
    "cropped", "waist", "hip", "thigh", "knee", "long", "maxi", "other",
];

const CLOSURE: &[&str] = &["zipper", "button", "wrap", "hook", "open", "none", "other"];

const STYLE_TAGS: &[&str] = &[
    "minimal", "classic", "street", "sporty", "gorpcore", "preppy", "amekaji", "feminine", "chic",
    "vintage", "business", "formal", "casual", "other",
];

const SEASON: &[&str] = &[
    "spring",
    "summer",
    "fall",
    "winter",
    "all-season",
    "transitional",
];

const CATEGORY_MAIN_ALIASES: &[(&str, &str)] = &[
    ("clothing", "top"),
    ("tops", "top"),
    ("sweater", "top"),
    ("knitwear", "top"),
    ("blouses", "top"),
    ("shirt", "top"),
    ("cardigan", "outer"),
    ("jacket", "outer"),
    ("coat", "outer"),
    ("puffer", "outer"),
    ("outerwear", "outer"),
    ("pants", "bottom"),
    ("trousers", "bottom"),
    ("jeans", "bottom"),
    ("skirt", "bottom"),
    ("bottoms", "bottom"),
    ("dress", "onepiece"),
    ("gown", "onepiece"),
    ("one-piece", "onepiece"),
    ("sneakers", "shoes"),
    ("boots", "shoes"),
    ("heels", "shoes"),
    ("footwear", "shoes"),
    ("handbag", "accessory"),
    ("cap", "accessory"),
    ("hat", "accessory"),
    ("belt", "accessory"),
];

const CATEGORY_SUB_ALIASES: &[(&str, &str)] = &[
    ("round-neck", "tshirt"),
    ("tee", "tshirt"),
    ("t-shirt", "tshirt"),
    ("knitted-sweater", "knit"),
    ("pullover", "sweater"),
    ("suit-pants", "slacks"),
    ("chinos", "slacks"),
    ("trousers", "slacks"),
    ("denim-pants", "jeans"),
    ("blue-jeans", "jeans"),
    ("mini-skirt", "skirt"),
    ("maxi-skirt", "skirt"),
    ("running-shoes", "sneakers"),
    ("trainers", "sneakers"),
    ("camisole", "camisoles"),
    ("tank-top", "camisoles"),
    ("blouse", "blouses"),
    ("beanie", "cap"),
    ("beret", "hat"),
    ("muffler", "scarf"),
];

const COLOR_ALIASES: &[(&str, &str)] = &[
    ("dark blue", "indigo"),
    ("navy blue", "indigo"),
    ("light blue", "skyblue"),
    ("baby blue", "skyblue"),
    ("sky blue", "skyblue"),
    ("wine red", "wine"),
    ("burgundy", "wine"),
    ("dark green", "olive"),
    ("forest green", "olive"),
    ("gold metal", "gold"),
    ("silver metal", "silver"),
    ("off white", "ivory"),
    ("off-white", "ivory"),
    ("bone", "ivory"),
    ("grey", "gray"),
    ("dark gray", "charcoal"),
    ("dark grey", "charcoal"),
    ("tan", "camel"),
];

const TONE_ALIASES: &[(&str, &str)] = &[
    ("navy", "dark"),
    ("darkest", "dark"),
    ("pale", "pastel"),
    ("soft", "pastel"),
    ("dusty", "muted"),
    ("ashy", "muted"),
    ("bright", "vivid"),
    ("electric", "neon"),
    ("rich", "deep"),
    ("strong", "deep"),
];

const PATTERN_ALIASES: &[(&str, &str)] = &[
    ("plain", "solid"),
    ("striped", "stripe"),
    ("stripes", "stripe"),
    ("plaid", "check"),
    ("checked", "check"),
    ("tartan", "check"),
    ("polka dot", "dot"),
    ("dots", "dot"),
    ("flower", "floral"),
    ("leopard", "animal"),
    ("zebra", "animal"),
    ("printed", "graphic"),
    ("camouflage", "camo"),
];

const MATERIAL_ALIASES: &[(&str, &str)] = &[
    ("polyester", "poly"),
    ("nylon", "poly"),
    ("synthetic", "poly"),
    ("jeans", "denim"),
    ("jean", "denim"),
    ("cashmere", "wool"),
    ("angora", "wool"),
    ("satin", "silk"),
    ("shiny", "silk"),
];

const FIT_ALIASES: &[(&str, &str)] = &[
    ("baggy", "wide"),
    ("relaxed", "loose"),
    ("skinny", "tight"),
    ("bodycon", "tight"),
    ("comfy", "regular"),
    ("standard", "regular"),
];

const NECKLINE_ALIASES: &[(&str, &str)] = &[
    ("round", "crew"),
    ("round-neck", "crew"),
    ("crew neck", "crew"),
    ("crewneck", "crew"),
    ("v-neck", "vneck"),
    ("polo", "collar"),
    ("shirt neck", "collar"),
    ("half-turtleneck", "mock-neck"),
    ("semi-turtleneck", "mock-neck"),
    ("low cut", "u-neck"),
    ("scoop", "u-neck"),
    ("hooded", "hood"),
];

const SLEEVE_ALIASES: &[(&str, &str)] = &[
    ("none", "sleeveless"),
    ("short-sleeve", "short"),
    ("3/4", "half"),
    ("three-quarter", "half"),
    ("long-sleeve", "long"),
];

const LENGTH_ALIASES: &[(&str, &str)] = &[
    ("short", "cropped"),
    ("crop", "cropped"),
    ("mini", "thigh"),
    ("midi", "knee"),
    ("full-length", "maxi"),
    ("ankle", "maxi"),
];

const CLOSURE_ALIASES: &[(&str, &str)] = &[
    ("no closure", "none"),
    ("invisible", "none"),
    ("pullover", "none"),
    ("buttons", "button"),
    ("zip", "zipper"),
    ("tie", "wrap"),
    ("ribbon", "wrap"),
];

const STYLE_TAG_ALIASES: &[(&str, &str)] = &[
    ("minimalist", "minimal"),
    ("streetwear", "street"),
    ("sport", "sporty"),
    ("athleisure", "sporty"),
    ("office", "business"),
    ("retro", "vintage"),
];

const SEASON_ALIASES: &[(&str, &str)] = &[
    ("autumn", "fall"),
    ("all season", "all-season"),
    ("all", "all-season"),
    ("year-round", "all-season"),
];

/// An enum-constrained field of the attribute record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CategoryMain,
    CategorySub,
    Color,
    Tone,
    Pattern,
    Material,
    Fit,
    Neckline,
    Sleeve,
    Length,
    Closure,
    StyleTag,
    Season,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::CategoryMain,
        Field::CategorySub,
        Field::Color,
        Field::Tone,
        Field::Pattern,
        Field::Material,
        Field::Fit,
        Field::Neckline,
        Field::Sleeve,
        Field::Length,
        Field::Closure,
        Field::StyleTag,
        Field::Season,
    ];

    /// Dotted wire path, used in validation messages and prompts.
    pub fn path(self) -> &'static str {
        match self {
            Field::CategoryMain => "category.main",
            Field::CategorySub => "category.sub",
            Field::Color => "color.primary",
            Field::Tone => "color.tone",
            Field::Pattern => "pattern.type",
            Field::Material => "material.guess",
            Field::Fit => "fit.type",
            Field::Neckline => "neckline",
            Field::Sleeve => "sleeve",
            Field::Length => "length",
            Field::Closure => "closure",
            Field::StyleTag => "style_tags",
            Field::Season => "scores.season",
        }
    }

    pub fn values(self) -> &'static [&'static str] {
        match self {
            Field::CategoryMain => CATEGORY_MAIN,
            Field::CategorySub => CATEGORY_SUB,
            Field::Color => COLOR,
            Field::Tone => TONE,
            Field::Pattern => PATTERN,
            Field::Material => MATERIAL,
            Field::Fit => FIT,
            Field::Neckline => NECKLINE,
            Field::Sleeve => SLEEVE,
            Field::Length => LENGTH,
            Field::Closure => CLOSURE,
            Field::StyleTag => STYLE_TAGS,
            Field::Season => SEASON,
        }
    }

    fn aliases(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Field::CategoryMain => CATEGORY_MAIN_ALIASES,
            Field::CategorySub => CATEGORY_SUB_ALIASES,
            Field::Color => COLOR_ALIASES,
            Field::Tone => TONE_ALIASES,
            Field::Pattern => PATTERN_ALIASES,
            Field::Material => MATERIAL_ALIASES,
            Field::Fit => FIT_ALIASES,
            Field::Neckline => NECKLINE_ALIASES,
            Field::Sleeve => SLEEVE_ALIASES,
            Field::Length => LENGTH_ALIASES,
            Field::Closure => CLOSURE_ALIASES,
            Field::StyleTag => STYLE_TAG_ALIASES,
            Field::Season => SEASON_ALIASES,
        }
    }

    /// True if `token` is canonical for this field or the literal "unknown".
    pub fn accepts(self, token: &str) -> bool {
        token == UNKNOWN || self.values().contains(&token)
    }

    /// Lowercase, trim, alias, then test membership. Never fails.
    pub fn resolve(self, raw: &str) -> &'static str {
        let token = raw.trim().to_lowercase();
        let token = self
            .aliases()
            .iter()
            .find(|(alias, _)| *alias == token)
            .map(|(_, canonical)| *canonical)
            .unwrap_or(token.as_str());

        self.values()
            .iter()
            .copied()
            .find(|v| *v == token)
            .unwrap_or(UNKNOWN)
    }
}

/// The fully-populated record every normalization starts from.
pub fn default_record() -> AttributeRecord {
    AttributeRecord {
        category: Category {
            main: UNKNOWN.to_string(),
            sub: UNKNOWN.to_string(),
            confidence: 0.2,
        },
        color: Color {
            primary: UNKNOWN.to_string(),
            secondary: Vec::new(),
            tone: UNKNOWN.to_string(),
            confidence: 0.2,
        },
        pattern: Pattern {
            kind: UNKNOWN.to_string(),
            confidence: 0.2,
        },
        material: Material {
            guess: UNKNOWN.to_string(),
            confidence: 0.2,
        },
        fit: Fit {
            kind: UNKNOWN.to_string(),
            confidence: 0.2,
        },
        neckline: UNKNOWN.to_string(),
        sleeve: UNKNOWN.to_string(),
        length: UNKNOWN.to_string(),
        closure: vec!["none".to_string()],
        style_tags: Vec::new(),
        scores: Scores {
            formality: 0.3,
            warmth: 0.3,
            thickness: 0.3,
            season: Vec::new(),
            versatility: 0.5,
        },
        meta: Meta {
            is_layering_piece: false,
            layering_rank: 2,
            print_or_logo: false,
            notes: None,
        },
        confidence: 0.2,
    }
}
