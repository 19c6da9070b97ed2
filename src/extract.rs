//! Heuristic attribute extraction.
//!
//! Derives structured `attr_*` fields from the Romanian product name and
//! description using a declarative [`RuleSet`]: an ordered list of rules,
//! each producing one attribute from either a keyword table or a regex
//! pattern with a value transform.
//!
//! Extraction is total and deterministic. The tie-break order is fixed:
//!
//! 1. Rules run in the order they are declared in [`RuleSet::new`], and the
//!    first rule to produce a value for an attribute wins.
//! 2. Both text fields are searched as one haystack built as
//!    `name + " " + description`, so a match in the name always precedes
//!    (and therefore beats) a match in the description.
//! 3. Keyword tables are scanned in declared order; the first keyword
//!    contained in the lowercased haystack wins.
//! 4. Regex rules take the leftmost match in the original-case haystack.
//!
//! Keyword tables can be overridden per-attribute via `[extraction]` in the
//! config; the regex patterns are built in and validated when the rule set
//! is constructed, so [`RuleSet::extract`] itself cannot fail.

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;

use crate::config::ExtractionConfig;
use crate::models::{AttributeMap, NormalizedRecord};

const FINISH_KEYWORDS: &[&str] = &[
    "mat",
    "matte",
    "gloss",
    "lucios",
    "glitter",
    "shimmer",
    "reflectiv",
];
const CURING_KEYWORDS: &[&str] = &["uv/led", "uv led", "uv", "led"];
const LIQUID_TYPES: &[&str] = &[
    "cleaner",
    "remover",
    "aceton", // matches both acetona and acetonă
    "slip solution",
    "degresant",
    "primer",
];
const SCENT_KEYWORDS: &[&str] = &[
    "lavanda",
    "lavandă",
    "capsuni",
    "căpșuni",
    "vanilie",
    "cocos",
    "trandafir",
];
const MATERIAL_KEYWORDS: &[&str] = &["inox", "otel", "oțel", "carbon", "abs", "plastic"];
const SHAPE_KEYWORDS: &[&str] = &[
    "oval",
    "banană",
    "banana",
    "drept",
    "straight",
    "half-moon",
    "semilună",
];
const COLOR_KEYWORDS: &[&str] = &[
    "alb",
    "negru",
    "rosu",
    "roșu",
    "roz",
    "nude",
    "albastru",
    "verde",
    "mov",
    "galben",
    "portocaliu",
    "auriu",
    "argintiu",
];

/// How a matched keyword becomes an attribute value.
#[derive(Debug, Clone, Copy)]
enum KeywordValue {
    /// The keyword itself, as listed in the table.
    AsIs,
    /// Spaces removed, uppercased ("uv led" → "UVLED", "uv/led" → "UV/LED").
    CompactUpper,
}

/// How a regex match becomes an attribute value.
#[derive(Debug, Clone, Copy)]
enum PatternValue {
    /// Capture group parsed as a number.
    Number(usize),
    /// Capture group as trimmed text.
    Text(usize),
    /// The whole match, uppercased.
    WholeUpper,
    /// The whole match, exactly as written.
    Whole,
}

#[derive(Debug)]
enum Matcher {
    Keywords {
        table: Vec<String>,
        value: KeywordValue,
    },
    Pattern {
        regex: Regex,
        value: PatternValue,
    },
}

/// One declarative extraction rule: the attribute it produces plus its
/// matching logic.
#[derive(Debug)]
struct Rule {
    attribute: &'static str,
    matcher: Matcher,
}

/// Ordered set of extraction rules. Construct once per run from the config
/// and reuse across records.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build the default rule set, applying any keyword-table overrides
    /// from the config.
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let colors = table(&config.color_keywords, COLOR_KEYWORDS);
        let shade_color_pattern = shade_color_pattern(&colors);

        let rules = vec![
            pattern_rule("attr_volume_ml", r"(?i)(\d{1,3})\s?ml\b", PatternValue::Number(1))?,
            pattern_rule("attr_grit", r"\b(\d{2,3}/\d{2,3})\b", PatternValue::Text(1))?,
            pattern_rule(
                "attr_shade_code",
                r"(#[0-9a-fA-F]{2,4}|[A-Z]{1,2}\d{2,3})\b",
                PatternValue::WholeUpper,
            )?,
            keyword_rule(
                "attr_finish",
                table(&config.finish_keywords, FINISH_KEYWORDS),
                KeywordValue::AsIs,
            ),
            keyword_rule(
                "attr_curing_type",
                table(&config.curing_keywords, CURING_KEYWORDS),
                KeywordValue::CompactUpper,
            ),
            keyword_rule(
                "attr_liquid_type",
                table(&config.liquid_types, LIQUID_TYPES),
                KeywordValue::AsIs,
            ),
            keyword_rule(
                "attr_scent",
                table(&config.scent_keywords, SCENT_KEYWORDS),
                KeywordValue::AsIs,
            ),
            pattern_rule(
                "attr_strength_percent",
                r"(\d{2,3})\s?%",
                PatternValue::Number(1),
            )?,
            pattern_rule("attr_length_mm", r"(?i)(\d{2,4})\s?mm\b", PatternValue::Number(1))?,
            keyword_rule(
                "attr_material",
                table(&config.material_keywords, MATERIAL_KEYWORDS),
                KeywordValue::AsIs,
            ),
            keyword_rule(
                "attr_shape",
                table(&config.shape_keywords, SHAPE_KEYWORDS),
                KeywordValue::AsIs,
            ),
            keyword_rule("attr_color_name", colors, KeywordValue::AsIs),
            pattern_rule("attr_shade_color", &shade_color_pattern, PatternValue::Whole)?,
            pattern_rule(
                "attr_collection",
                r"(?i)colect(?:ia|iei)\s+([\w-]{3,30}?)(?:\s+\d|\s*$)",
                PatternValue::Text(1),
            )?,
        ];

        Ok(Self { rules })
    }

    /// Extract attributes from a record's name and description.
    pub fn extract_record(&self, record: &NormalizedRecord) -> AttributeMap {
        self.extract(&record.name, record.description())
    }

    /// Apply all rules against the given text fields. Returns a (possibly
    /// empty) attribute map; never fails.
    pub fn extract(&self, name: &str, description: Option<&str>) -> AttributeMap {
        let haystack = match description {
            Some(desc) if !desc.is_empty() => format!("{} {}", name, desc),
            _ => name.to_string(),
        };
        let haystack_lower = haystack.to_lowercase();

        let mut attributes = AttributeMap::new();
        for rule in &self.rules {
            if attributes.contains_key(rule.attribute) {
                continue;
            }
            if let Some(value) = rule.matcher.eval(&haystack, &haystack_lower) {
                attributes.insert(rule.attribute.to_string(), value);
            }
        }
        attributes
    }
}

impl Matcher {
    fn eval(&self, haystack: &str, haystack_lower: &str) -> Option<Value> {
        match self {
            Matcher::Keywords { table, value } => {
                let keyword = table.iter().find(|k| haystack_lower.contains(k.as_str()))?;
                Some(match value {
                    KeywordValue::AsIs => Value::String(keyword.clone()),
                    KeywordValue::CompactUpper => {
                        Value::String(keyword.replace(' ', "").to_uppercase())
                    }
                })
            }
            Matcher::Pattern { regex, value } => {
                let captures = regex.captures(haystack)?;
                match value {
                    PatternValue::Number(group) => captures
                        .get(*group)
                        .and_then(|m| m.as_str().parse::<f64>().ok())
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number),
                    PatternValue::Text(group) => captures
                        .get(*group)
                        .map(|m| Value::String(m.as_str().trim().to_string())),
                    PatternValue::WholeUpper => {
                        Some(Value::String(captures[0].to_uppercase()))
                    }
                    PatternValue::Whole => Some(Value::String(captures[0].to_string())),
                }
            }
        }
    }
}

fn keyword_rule(attribute: &'static str, table: Vec<String>, value: KeywordValue) -> Rule {
    Rule {
        attribute,
        matcher: Matcher::Keywords { table, value },
    }
}

fn pattern_rule(attribute: &'static str, pattern: &str, value: PatternValue) -> Result<Rule> {
    let regex = Regex::new(pattern)
        .with_context(|| format!("invalid extraction pattern for {}", attribute))?;
    Ok(Rule {
        attribute,
        matcher: Matcher::Pattern { regex, value },
    })
}

/// Resolve a keyword table: the config override when set, otherwise the
/// built-in default. Keywords are lowercased to match the lowercased
/// haystack.
fn table(override_table: &Option<Vec<String>>, default: &[&str]) -> Vec<String> {
    match override_table {
        Some(keywords) => keywords.iter().map(|k| k.to_lowercase()).collect(),
        None => default.iter().map(|k| k.to_string()).collect(),
    }
}

/// The shade-color pattern matches a color keyword as written, plus any
/// following capitalized qualifier words ("Rosu Rubin", "Verde Smarald").
fn shade_color_pattern(colors: &[String]) -> String {
    let alternation = colors
        .iter()
        .map(|c| regex::escape(c))
        .collect::<Vec<_>>()
        .join("|");
    format!(r"\b(?i:{})\b(?:\s+\p{{Lu}}[\p{{Ll}}-]*)*", alternation)
}
