//! Billed party (請求先) and issuer (発行者) extraction.
//!
//! The billed company is located structurally: a bounded window after the
//! `請求先` keyword, preferring a line with a corporate-entity marker. The
//! issuer is searched in the text following the billing block, since the
//! billed party's own name would otherwise be the first corporate line.

use super::cascade::{AnchorScan, Cascade, Rule};
use super::normalize::{fold_width, split_lines};
use super::patterns::{
    ADDRESS_LABELED, CONTACT_HONORIFIC, CONTACT_LABELED, DEPARTMENT, HONORIFIC_NAME,
    ISSUER_LABELED, POSTAL_CODE, PREFECTURE_ADDRESS,
};
use super::{ExtractionMatch, FieldExtractor};

const CLIENT_ANCHOR: &str = "請求先";

const CORPORATE_MARKERS: [&str; 22] = [
    "株式会社",
    "有限会社",
    "合同会社",
    "合資会社",
    "合名会社",
    "一般社団法人",
    "一般財団法人",
    "公益社団法人",
    "公益財団法人",
    "特定非営利活動法人",
    "NPO法人",
    "医療法人",
    "学校法人",
    "社会福祉法人",
    "(株)",
    "(有)",
    "(同)",
    "㈱",
    "㈲",
    "Co.,Ltd.",
    "Inc.",
    "LLC",
];

const HONORIFICS: [&str; 4] = ["御中", "様", "殿", "各位"];

const NAME_LABELS: [&str; 8] = [
    "ご請求先",
    "御請求先",
    "請求先",
    "発行者",
    "発行元",
    "請求元",
    "差出人",
    "請求者",
];

/// Parties found on an invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parties {
    /// Billed company (請求先).
    pub client_name: Option<ExtractionMatch<String>>,
    /// Billed department.
    pub department: Option<ExtractionMatch<String>>,
    /// Billed contact person.
    pub contact_person: Option<ExtractionMatch<String>>,
    pub issuer_name: Option<ExtractionMatch<String>>,
    pub issuer_address: Option<ExtractionMatch<String>>,
    /// Text after the billing block, where issuer contact details live.
    pub issuer_region: String,
}

/// Extractor for the billed party and the issuer.
#[derive(Debug)]
pub struct PartyExtractor {
    lookahead: usize,
    client_scan: AnchorScan,
    client_honorific: Cascade<String>,
    department: Cascade<String>,
    contact: Cascade<String>,
    issuer: Cascade<String>,
    address: Cascade<String>,
}

impl PartyExtractor {
    /// Create an extractor looking `lookahead` lines past the `請求先` anchor.
    pub fn new(lookahead: usize) -> Self {
        Self {
            lookahead,
            client_scan: AnchorScan::new(CLIENT_ANCHOR, lookahead)
                .accept(is_name_candidate)
                .prefer(has_corporate_marker),
            client_honorific: Cascade::new("billing_to.company_name")
                .rule(Rule::pattern(&HONORIFIC_NAME, 0.6, clean_company_name)),
            department: Cascade::new("billing_to.department")
                .rule(Rule::pattern(&DEPARTMENT, 0.7, validate_department)),
            contact: Cascade::new("billing_to.contact_person")
                .rule(Rule::pattern(&CONTACT_LABELED, 0.85, validate_contact))
                .rule(Rule::pattern(&CONTACT_HONORIFIC, 0.6, validate_contact)),
            issuer: Cascade::new("issuer.name")
                .rule(Rule::pattern(&ISSUER_LABELED, 0.9, clean_company_name))
                .rule(Rule::finder(issuer_lines, 0.8, clean_company_name)),
            address: Cascade::new("issuer.address")
                .rule(Rule::pattern(&ADDRESS_LABELED, 0.9, validate_address))
                .rule(Rule::finder(postal_lines, 0.8, validate_address))
                .rule(Rule::pattern(&PREFECTURE_ADDRESS, 0.5, validate_address)),
        }
    }

    pub fn extract(&self, text: &str) -> Parties {
        let lines = split_lines(text);

        // Billed party, and the line range its block occupies.
        let (client_name, block) = match self.client_scan.scan(&lines) {
            Some(hit) => {
                let confidence = if hit.preferred { 0.9 } else { 0.75 };
                let client = clean_company_name(&hit.line)
                    .map(|name| ExtractionMatch::new(name, confidence, hit.line.clone()));
                (client, Some((hit.anchor_index, hit.index)))
            }
            None => {
                let client = self.client_honorific.extract(text);
                let block = client
                    .as_ref()
                    .and_then(|m| m.position)
                    .map(|(start, _)| text[..start].matches('\n').count())
                    .map(|index| (index, index));
                (client, block)
            }
        };

        let (department, contact_person, issuer_start) = match block {
            Some((start, hit_index)) => {
                let end = (start + self.lookahead + 2).min(lines.len());
                let block_text = lines[start..end].join("\n");
                (
                    self.department.extract(&block_text),
                    self.contact.extract(&block_text),
                    hit_index + 1,
                )
            }
            None => (None, None, 0),
        };

        let issuer_region = lines
            .get(issuer_start..)
            .map(|rest| rest.join("\n"))
            .unwrap_or_default();

        let issuer_name = self.issuer.extract(&issuer_region).or_else(|| {
            // Issuer printed above the billing block.
            let before = lines[..issuer_start.min(lines.len())]
                .iter()
                .filter(|line| {
                    client_name
                        .as_ref()
                        .is_none_or(|client| !line.contains(client.value.as_str()))
                })
                .cloned()
                .collect::<Vec<_>>()
                .join("\n");
            self.issuer.extract(&before)
        });

        let issuer_address = self
            .address
            .extract(&issuer_region)
            .or_else(|| self.address.extract(text));

        Parties {
            client_name,
            department,
            contact_person,
            issuer_name,
            issuer_address,
            issuer_region,
        }
    }
}

impl Default for PartyExtractor {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Extract parties from text with the default anchor window.
pub fn extract_parties(text: &str) -> Parties {
    PartyExtractor::default().extract(text)
}

/// Whether `s` carries a corporate-entity marker such as 株式会社 or (株).
pub fn has_corporate_marker(s: &str) -> bool {
    let folded = fold_width(s);
    CORPORATE_MARKERS.iter().any(|m| folded.contains(m))
}

/// Canonical issuer name for matching: entity markers, whitespace and
/// width variants removed, upper-cased.
pub fn normalize_company_name(name: &str) -> String {
    let mut folded = fold_width(name);
    for marker in CORPORATE_MARKERS {
        folded = folded.replace(marker, "");
    }
    folded
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Strip labels and honorifics from a company-name candidate.
///
/// Rejects lines that are really addresses or contact details and names
/// outside 2 - 60 characters.
pub fn clean_company_name(candidate: &str) -> Option<String> {
    let mut name = candidate.trim();
    if let Some(rest) = NAME_LABELS.iter().find_map(|label| name.strip_prefix(label)) {
        name = rest;
    }
    name = name.trim_start_matches([':', '：', ' ', '\u{3000}']);

    loop {
        let trimmed = name.trim_end();
        match HONORIFICS.iter().find_map(|h| trimmed.strip_suffix(h)) {
            Some(rest) => name = rest,
            None => {
                name = trimmed;
                break;
            }
        }
    }

    let upper = fold_width(name).to_uppercase();
    if ["〒", "TEL", "FAX", "@"].iter().any(|s| upper.contains(s)) {
        return None;
    }

    let len = name.chars().count();
    let has_letters = name.chars().any(char::is_alphabetic);
    (has_letters && (2..=60).contains(&len)).then(|| name.to_string())
}

fn is_name_candidate(line: &str) -> bool {
    !line.contains([':', '：']) && clean_company_name(line).is_some()
}

fn is_issuer_line(line: &str) -> bool {
    has_corporate_marker(line)
        && !HONORIFICS.iter().any(|h| line.contains(h))
        && !["請求先", "振込", "銀行", "口座", "名義"]
            .iter()
            .any(|s| line.contains(s))
}

fn issuer_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| is_issuer_line(line))
        .map(str::to_string)
        .collect()
}

/// Lines carrying a postal code, joined with the next line when the
/// address itself continues there.
fn postal_lines(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut candidates = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(postal) = POSTAL_CODE.find(line) else {
            continue;
        };
        let rest = line[postal.end()..].trim();

        if rest.chars().count() < 5 {
            if let Some(next) = lines.get(i + 1) {
                candidates.push(format!("{} {}", line, next.trim()));
                continue;
            }
        }
        candidates.push(line.to_string());
    }

    candidates
}

fn validate_address(candidate: &str) -> Option<String> {
    let folded = fold_width(candidate);
    let upper = folded.to_ascii_uppercase();
    let cut = ["TEL", "FAX", "電話", "E-MAIL", "MAIL"]
        .iter()
        .filter_map(|s| upper.find(s))
        .min()
        .unwrap_or(folded.len());

    let address = folded[..cut].trim().trim_end_matches([',', '、']).trim();
    let len = address.chars().count();
    ((5..=120).contains(&len) && address.chars().any(char::is_alphabetic))
        .then(|| address.to_string())
}

fn validate_department(candidate: &str) -> Option<String> {
    let department = candidate.trim();
    let len = department.chars().count();
    (!has_corporate_marker(department) && (2..=30).contains(&len)).then(|| department.to_string())
}

fn validate_contact(candidate: &str) -> Option<String> {
    let name = candidate.trim().trim_end_matches(['様', '殿']).trim();
    if name.contains("御中") {
        return None;
    }

    // "株式会社サンプル 山田 太郎": drop the company tokens.
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let start = tokens
        .iter()
        .rposition(|t| has_corporate_marker(t))
        .map_or(0, |i| i + 1);
    let person = tokens[start..].join(" ");

    let len = person.chars().count();
    ((2..=30).contains(&len) && person.chars().any(char::is_alphabetic)).then_some(person)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value(m: &Option<ExtractionMatch<String>>) -> Option<&str> {
        m.as_ref().map(|m| m.value.as_str())
    }

    const ANCHORED: &str = "\
請求書
請求先
株式会社サンプル 御中
営業部
山田 太郎 様

株式会社発行商事
〒150-0001
東京都渋谷区神宮前1-2-3
TEL 03-1234-5678
";

    #[test]
    fn test_anchored_billing_block() {
        let parties = extract_parties(ANCHORED);

        let client = parties.client_name.unwrap();
        assert_eq!(client.value, "株式会社サンプル");
        assert_eq!(client.confidence, 0.9);
        assert_eq!(value(&parties.department), Some("営業部"));
        assert_eq!(value(&parties.contact_person), Some("山田 太郎"));
    }

    #[test]
    fn test_issuer_after_billing_block() {
        let parties = extract_parties(ANCHORED);

        let issuer = parties.issuer_name.unwrap();
        assert_eq!(issuer.value, "株式会社発行商事");
        assert_eq!(issuer.confidence, 0.8);
        assert_eq!(
            value(&parties.issuer_address),
            Some("〒150-0001 東京都渋谷区神宮前1-2-3")
        );
        assert!(!parties.issuer_region.contains("株式会社サンプル"));
    }

    #[test]
    fn test_anchor_without_corporate_marker() {
        let parties = extract_parties("ご請求先\n\n山田商店\n");
        let client = parties.client_name.unwrap();
        assert_eq!(client.value, "山田商店");
        assert_eq!(client.confidence, 0.75);
    }

    #[test]
    fn test_honorific_fallback() {
        let text = "株式会社サンプル 御中\n\n有限会社テスト\n東京都千代田区丸の内1-1-1\n";
        let parties = extract_parties(text);

        let client = parties.client_name.unwrap();
        assert_eq!(client.value, "株式会社サンプル");
        assert_eq!(client.confidence, 0.6);
        assert_eq!(value(&parties.issuer_name), Some("有限会社テスト"));

        let address = parties.issuer_address.unwrap();
        assert_eq!(address.value, "東京都千代田区丸の内1-1-1");
        assert_eq!(address.confidence, 0.5);
    }

    #[test]
    fn test_labeled_issuer_and_address() {
        let text = "発行元: 株式会社テスト\n住所: 大阪府大阪市北区梅田1-1 TEL 06-0000-0000\n";
        let parties = extract_parties(text);

        let issuer = parties.issuer_name.unwrap();
        assert_eq!(issuer.value, "株式会社テスト");
        assert_eq!(issuer.confidence, 0.9);
        assert_eq!(value(&parties.issuer_address), Some("大阪府大阪市北区梅田1-1"));
    }

    #[test]
    fn test_issuer_above_billing_block() {
        let text = "株式会社発行商事\n請求先\n株式会社サンプル 御中\n";
        let parties = extract_parties(text);
        assert_eq!(value(&parties.client_name), Some("株式会社サンプル"));
        assert_eq!(value(&parties.issuer_name), Some("株式会社発行商事"));
    }

    #[test]
    fn test_nothing_found() {
        let parties = extract_parties("");
        assert_eq!(parties.client_name, None);
        assert_eq!(parties.issuer_name, None);
    }

    #[test]
    fn test_normalize_company_name() {
        assert_eq!(normalize_company_name("株式会社 サンプル"), "サンプル");
        assert_eq!(normalize_company_name("（株）ＡＢＣ"), "ABC");
        assert_eq!(normalize_company_name("abc有限会社"), "ABC");
        assert_eq!(normalize_company_name("㈱テスト　商事"), "テスト商事");
    }

    #[test]
    fn test_clean_company_name() {
        assert_eq!(clean_company_name("請求先：株式会社X 御中"), Some("株式会社X".to_string()));
        assert_eq!(clean_company_name("御中"), None);
        assert_eq!(clean_company_name("〒100-0001"), None);
        assert_eq!(clean_company_name("TEL 03-0000-0000"), None);
    }

    #[test]
    fn test_contact_drops_company_tokens() {
        assert_eq!(validate_contact("株式会社サンプル 山田 太郎"), Some("山田 太郎".to_string()));
        assert_eq!(validate_contact("経理部 御中"), None);
    }
}
