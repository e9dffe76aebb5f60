use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Transfer,
    Card,
    Withdrawal,
    Deposit,
    Fee,
    Interest,
    Advance,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Transfer,
        Category::Card,
        Category::Withdrawal,
        Category::Deposit,
        Category::Fee,
        Category::Interest,
        Category::Advance,
        Category::Other,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Transfer => write!(f, "TRANSFER"),
            Category::Card => write!(f, "CARD"),
            Category::Withdrawal => write!(f, "WITHDRAWAL"),
            Category::Deposit => write!(f, "DEPOSIT"),
            Category::Fee => write!(f, "FEE"),
            Category::Interest => write!(f, "INTEREST"),
            Category::Advance => write!(f, "ADVANCE"),
            Category::Other => write!(f, "OTHER"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    fn new(category: Category, keywords: &[&str]) -> Self {
        CategoryRule {
            category,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(k.as_str()))
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to parse category rules: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Deserialize)]
struct RuleFile {
    rules: Vec<CategoryRule>,
}

/// Ordered keyword rules; the first rule with a keyword contained in the
/// lower-cased description wins. Unmatched descriptions are `OTHER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorizer {
    rules: Vec<CategoryRule>,
}

impl Default for Categorizer {
    // Order is load-bearing: "tarifa de cartao" must stay CARD.
    fn default() -> Self {
        Self::new(vec![
            CategoryRule::new(Category::Transfer, &["pix", "ted", "doc"]),
            CategoryRule::new(Category::Card, &["cartao", "card", "credito", "debito"]),
            CategoryRule::new(Category::Withdrawal, &["saque", "withdrawal"]),
            CategoryRule::new(Category::Deposit, &["deposito", "deposit"]),
            CategoryRule::new(Category::Fee, &["tarifa", "taxa", "fee", "fatura"]),
            CategoryRule::new(Category::Interest, &["juros", "interest", "rendimento"]),
            CategoryRule::new(Category::Advance, &["antecipacao", "antec"]),
        ])
    }
}

impl Categorizer {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| CategoryRule {
                category: r.category,
                keywords: r.keywords.iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();
        Self { rules }
    }

    /// `[[rules]]` tables with `category` and `keywords`, in priority order.
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        Ok(Self::new(file.rules))
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn categorize(&self, description: &str) -> Category {
        let lowered = description.to_lowercase();
        self.rules
            .iter()
            .find(|r| r.matches(&lowered))
            .map(|r| r.category)
            .unwrap_or(Category::Other)
    }
}

/// Classify with the built-in rule table.
pub fn categorize(description: &str) -> Category {
    static DEFAULT: OnceLock<Categorizer> = OnceLock::new();
    DEFAULT.get_or_init(Categorizer::default).categorize(description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_rule_matches_its_keywords() {
        assert_eq!(categorize("PIX ENVIADO Maria"), Category::Transfer);
        assert_eq!(categorize("TED 001 recebida"), Category::Transfer);
        assert_eq!(categorize("Compra Cartao Visa"), Category::Card);
        assert_eq!(categorize("card purchase"), Category::Card);
        assert_eq!(categorize("SAQUE 24H"), Category::Withdrawal);
        assert_eq!(categorize("Deposito em especie"), Category::Deposit);
        assert_eq!(categorize("Tarifa mensal"), Category::Fee);
        assert_eq!(categorize("Taxa iFood"), Category::Fee);
        assert_eq!(categorize("JUROS CHEQUE ESPECIAL"), Category::Interest);
        assert_eq!(categorize("Rendimento poupanca"), Category::Interest);
        assert_eq!(categorize("ANTECIPACAO RECEBIVEIS"), Category::Advance);
    }

    #[test]
    fn unmatched_and_empty_are_other() {
        assert_eq!(categorize("Padaria Sao Jorge"), Category::Other);
        assert_eq!(categorize(""), Category::Other);
        assert_eq!(categorize("   "), Category::Other);
    }

    #[test]
    fn earliest_rule_wins() {
        assert_eq!(categorize("tarifa de cartao"), Category::Card);
        assert_eq!(categorize("pix cartao"), Category::Transfer);
        assert_eq!(categorize("juros antecipacao"), Category::Interest);
    }

    #[test]
    fn substring_matching_is_literal() {
        // "doc" inside "documento", "ted" inside "credited".
        assert_eq!(categorize("documento"), Category::Transfer);
        assert_eq!(categorize("credited"), Category::Transfer);
        // Accented spelling is not folded.
        assert_eq!(categorize("Cartão"), Category::Other);
    }

    #[test]
    fn category_display_and_serde_names_agree() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
        }
    }

    #[test]
    fn custom_rules_from_toml() {
        let categorizer = Categorizer::from_toml(
            r#"
[[rules]]
category = "FEE"
keywords = ["IOF"]

[[rules]]
category = "TRANSFER"
keywords = ["pix"]
"#,
        )
        .unwrap();
        assert_eq!(categorizer.rules().len(), 2);
        assert_eq!(categorizer.categorize("IOF sobre pix"), Category::Fee);
        assert_eq!(categorizer.categorize("pix"), Category::Transfer);
        assert_eq!(categorizer.categorize("saque"), Category::Other);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(Categorizer::from_toml("rules = 3").is_err());
        assert!(Categorizer::from_toml("[[rules]]\ncategory = \"NOPE\"\nkeywords = []").is_err());
    }

    #[test]
    fn empty_keyword_never_matches() {
        let categorizer = Categorizer::new(vec![CategoryRule {
            category: Category::Fee,
            keywords: vec![String::new()],
        }]);
        assert_eq!(categorizer.categorize("anything"), Category::Other);
    }
}
