//! Declarative pattern tables
//!
//! Each category is described as data: an ordered list of regular expressions
//! plus keyword groups that boost the confidence of a candidate when one of the
//! words appears in its surrounding context. Adding a category means adding a
//! table entry, not a code branch.
//!
//! Capitalized-name groups are case-sensitive; connector words (titles, verbs,
//! prepositions) are wrapped in `(?i:...)`.

use regex::Regex;

use super::category::EntityCategory;
use crate::error::{Error, Result};

/// Words that never stand alone as an entity
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "this", "that", "these", "those", "is", "are", "was", "were", "be", "been", "being", "have",
    "has", "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
];

/// Context words that add `bonus` to a candidate's confidence when any of them is present
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordGroup {
    pub words: Vec<String>,
    pub bonus: f32,
}

impl KeywordGroup {
    pub fn new(words: &[&str], bonus: f32) -> Self {
        Self {
            words: words.iter().map(|w| w.to_string()).collect(),
            bonus,
        }
    }

    /// Whether any keyword occurs in the already lower-cased context
    pub fn matches(&self, context_lower: &str) -> bool {
        self.words.iter().any(|w| context_lower.contains(w.as_str()))
    }
}

/// Uncompiled rules for one category
#[derive(Debug, Clone)]
pub struct CategoryRules {
    pub category: EntityCategory,
    pub patterns: Vec<String>,
    pub keywords: Vec<KeywordGroup>,
}

impl CategoryRules {
    fn new(category: EntityCategory, patterns: &[&str], keywords: Vec<KeywordGroup>) -> Self {
        Self {
            category,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            keywords,
        }
    }
}

/// Built-in category rules
pub fn default_rules() -> Vec<CategoryRules> {
    vec![
        CategoryRules::new(
            EntityCategory::People,
            &[
                r"\b(?i:mr|mrs|ms|dr|prof|professor)\.?\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
                r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,2})\s+(?i:said|wrote|thinks|believes|argues|suggests|explains|states|mentioned|discussed|told|asked)\b",
                r"\b([A-Z][a-z]+)\s+(?i:is a|was a|works as|worked as|teaches|taught|studies)\b",
                r"(?i:\bby|\bfrom|\baccording to)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
            ],
            vec![
                KeywordGroup::new(
                    &["said", "wrote", "thinks", "believes", "discussed", "researcher", "professor", "dr."],
                    0.2,
                ),
                KeywordGroup::new(&["university", "published", "study", "research"], 0.1),
            ],
        ),
        CategoryRules::new(
            EntityCategory::Concepts,
            &[
                r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s+(?i:theory|principle|concept|framework|model|approach|methodology|paradigm)\b",
                r"(?i:\bconcept of|\btheory of|\bprinciple of|\bidea of)\s+([a-z][a-z ]+[a-z])",
                r"(?i)\b(artificial intelligence|machine learning|deep learning|neural networks|algorithms|programming|software|technology)\b",
                r"\b([a-z]+(?: [a-z]+)*)\s+(?:is defined as|refers to|means)\b",
                r"(?i:\bunderstanding|\blearning|\bstudying|\bexploring)\s+([a-z][a-z ]*(?:theory|concept|principle))\b",
            ],
            vec![
                KeywordGroup::new(&["theory", "concept", "principle", "framework", "approach"], 0.2),
                KeywordGroup::new(&["understanding", "learning", "study", "analysis"], 0.1),
            ],
        ),
        CategoryRules::new(
            EntityCategory::Tools,
            &[
                r"(?i)\b(?:(python|javascript|java|react|vue|angular|flask|django|node\.js|tensorflow|pytorch|git|docker|kubernetes)\b|(c\+\+))",
                r"\b([A-Z][a-zA-Z]*)\s+(?i:library|framework|tool|software|application|platform|system)\b",
                r"(?i:\busing)\s+([A-Z][a-zA-Z]*(?:\s+[A-Z][a-zA-Z]*)*)",
                r"(?i:\bwith)\s+([A-Z][a-zA-Z]*(?:\.[a-zA-Z]+)*)",
            ],
            vec![
                KeywordGroup::new(&["using", "with", "library", "framework", "tool"], 0.2),
                KeywordGroup::new(&["code", "programming", "software", "development"], 0.1),
            ],
        ),
        CategoryRules::new(
            EntityCategory::Locations,
            &[
                r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*),\s+(?:[A-Z]{2}|[A-Z][a-z]+)\b",
                r"(?i:\bin)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
                r"(?i:\bat)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\s+University)\b",
                r"(?i:\bat)\s+(Stanford|MIT|Harvard|Berkeley|Google|Microsoft|Apple|Meta|OpenAI)\b",
            ],
            vec![KeywordGroup::new(
                &["university", "city", "campus", "located", "headquarters"],
                0.1,
            )],
        ),
        CategoryRules::new(
            EntityCategory::TemporalEvents,
            &[
                r"(?i:\bin|\bduring|\bsince|\bbefore|\bafter)\s+(\d{1,2}/\d{1,2}/\d{4}|\d{4}|(?:January|February|March|April|May|June|July|August|September|October|November|December)(?:\s+\d{1,2})?)\b",
                r"(?i)\b(?:recently|yesterday|today|tomorrow|next week|last week|this year|last year)\b",
                r"(?i:\bwhen|\bwhile)\s+([^,.]+?(?:happened|occurred|started|began|ended))\b",
            ],
            vec![KeywordGroup::new(&["during", "since", "until", "when", "while"], 0.1)],
        ),
    ]
}

/// Definition patterns: group 1 is the term, group 2 the definition
pub const DEFINITION_PATTERNS: &[&str] = &[
    r"(?m)\b([A-Za-z][A-Za-z ]*?)\s+(?:is|are|refers to|means|defined as)\s+(.+?)(?:[.;,]|$)",
    r"(?m)(?i:\bthe term|\bthe concept of|\bthe idea of)\s+([A-Za-z][A-Za-z ]*?)\s+(?:is|refers to|means)\s+(.+?)(?:[.;,]|$)",
    r"(?m)\b([A-Za-z][A-Za-z ]*):\s+(.+?)(?:[.;]|$)",
];

/// Phrases that mark a match as an explicit definition
pub const DEFINITION_INDICATORS: &[&str] = &["refers to", "means", "defined as", "is a type of"];

/// Compiled rules for one category
#[derive(Debug)]
pub struct CompiledCategory {
    pub category: EntityCategory,
    pub patterns: Vec<Regex>,
    pub keywords: Vec<KeywordGroup>,
}

/// All compiled patterns, built once and shared read-only
#[derive(Debug)]
pub struct PatternTable {
    categories: Vec<CompiledCategory>,
    definitions: Vec<Regex>,
}

impl PatternTable {
    /// Compile the built-in tables
    pub fn builtin() -> Result<Self> {
        Self::compile(default_rules(), DEFINITION_PATTERNS)
    }

    /// Compile category rules and definition patterns, failing on the first bad expression
    pub fn compile(rules: Vec<CategoryRules>, definition_patterns: &[&str]) -> Result<Self> {
        let mut categories = Vec::with_capacity(rules.len());
        for rule in rules {
            let patterns = rule
                .patterns
                .iter()
                .map(|p| compile_one(rule.category.as_str(), p))
                .collect::<Result<Vec<_>>>()?;
            categories.push(CompiledCategory {
                category: rule.category,
                patterns,
                keywords: rule.keywords,
            });
        }

        let definitions = definition_patterns
            .iter()
            .map(|p| compile_one("definitions", p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            categories,
            definitions,
        })
    }

    pub fn categories(&self) -> &[CompiledCategory] {
        &self.categories
    }

    pub fn definitions(&self) -> &[Regex] {
        &self.definitions
    }

    /// Keyword groups for a category (empty when the category has no rules)
    pub fn keywords(&self, category: EntityCategory) -> &[KeywordGroup] {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.keywords.as_slice())
            .unwrap_or(&[])
    }
}

fn compile_one(category: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        category: category.to_string(),
        message: e.to_string(),
    })
}

pub fn is_stop_word(text_lower: &str) -> bool {
    STOP_WORDS.contains(&text_lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_compile() {
        let table = PatternTable::builtin().unwrap();
        assert_eq!(table.categories().len(), EntityCategory::ALL.len());
        assert_eq!(table.definitions().len(), 3);
    }

    #[test]
    fn test_invalid_pattern_fails_fast() {
        let rules = vec![CategoryRules::new(
            EntityCategory::Tools,
            &[r"([A-Z"],
            Vec::new(),
        )];
        let err = PatternTable::compile(rules, DEFINITION_PATTERNS).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref category, .. } if category == "tools"));
    }

    #[test]
    fn test_people_pattern_requires_capitalized_name() {
        let table = PatternTable::builtin().unwrap();
        let people = &table.categories()[0];
        let caps = people.patterns[0].captures("Dr. Alice Smith discussed it").unwrap();
        assert_eq!(&caps[1], "Alice Smith");
        assert!(people.patterns[0].captures("dr. alice smith").is_none());
    }

    #[test]
    fn test_keyword_group_matching() {
        let group = KeywordGroup::new(&["using", "library"], 0.2);
        assert!(group.matches("built using rust"));
        assert!(!group.matches("built in rust"));
    }
}
