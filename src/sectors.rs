// =============================================================================
// Sector / sub-industry table
// =============================================================================
//
// Static taxonomy used to seed the initial stock population and to label IPOs.
// Ported verbatim from the original service's sector configuration.

pub struct Sector {
    pub name: &'static str,
    pub sub_industries: &'static [&'static str],
}

pub const SECTORS: &[Sector] = &[
    Sector {
        name: "Technology",
        sub_industries: &["Cloud", "Semiconductors", "AI Hardware", "SaaS", "Cybersecurity"],
    },
    Sector {
        name: "Healthcare",
        sub_industries: &["Biotech", "Pharmaceuticals", "Medical Devices", "Payors"],
    },
    Sector {
        name: "Energy",
        sub_industries: &["E&P", "Renewables", "Midstream", "Services"],
    },
    Sector {
        name: "Financials",
        sub_industries: &["Banks", "Fintech", "Asset Management", "Insurance"],
    },
    Sector {
        name: "Consumer",
        sub_industries: &["Retail", "Luxury", "Staples", "E-commerce"],
    },
    Sector {
        name: "Industrials",
        sub_industries: &["Aerospace", "Logistics", "Infrastructure", "Manufacturing"],
    },
    Sector {
        name: "Communication",
        sub_industries: &["Telco", "Social Media", "Streaming", "Advertising"],
    },
    Sector {
        name: "Materials",
        sub_industries: &["Mining", "Chemicals", "Forestry", "Steel"],
    },
];

const NAME_SUFFIXES: &[&str] = &["Corp", "Systems", "Global", "Inc", "Group", "Holdings"];

/// Every (sector, sub_industry) pair in the taxonomy, flattened for seeding.
pub fn all_sub_industries() -> Vec<(&'static str, &'static str)> {
    SECTORS
        .iter()
        .flat_map(|s| s.sub_industries.iter().map(move |sub| (s.name, *sub)))
        .collect()
}

/// Pick a random sector and sub-industry pair.
pub fn random_sub_industry(rng: &mut crate::rng::SimRng) -> (&'static str, &'static str) {
    let pairs = all_sub_industries();
    *rng.choose(&pairs)
}

/// Generate a human-facing company name for a sub-industry, e.g. "Cloud Systems".
pub fn generate_name(sub_industry: &str, rng: &mut crate::rng::SimRng) -> String {
    let suffix = rng.choose(NAME_SUFFIXES);
    format!("{sub_industry} {suffix}")
}

/// Generate a ticker for a sector: first letter of the sector name followed
/// by 2-3 further random uppercase letters.
pub fn generate_ticker(sector: &str, rng: &mut crate::rng::SimRng) -> String {
    let first = sector.chars().next().unwrap_or('X').to_ascii_uppercase();
    let extra_len = rng.uniform_int(2, 3);
    let mut ticker = String::with_capacity(1 + extra_len as usize);
    ticker.push(first);
    for _ in 0..extra_len {
        ticker.push(rng.letter());
    }
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SimRng;

    #[test]
    fn eight_sectors() {
        assert_eq!(SECTORS.len(), 8);
    }

    #[test]
    fn all_sub_industries_are_non_empty() {
        for sector in SECTORS {
            assert!(!sector.sub_industries.is_empty());
        }
    }

    #[test]
    fn flattened_pair_count_matches_sum_of_sub_industries() {
        let total: usize = SECTORS.iter().map(|s| s.sub_industries.len()).sum();
        assert_eq!(all_sub_industries().len(), total);
    }

    #[test]
    fn ticker_starts_with_sector_initial_and_has_valid_length() {
        let mut rng = SimRng::from_seed(1);
        for _ in 0..50 {
            let ticker = generate_ticker("Technology", &mut rng);
            assert!(ticker.starts_with('T'));
            assert!(ticker.len() == 3 || ticker.len() == 4);
            assert!(ticker.chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn generated_name_includes_sub_industry_and_a_known_suffix() {
        let mut rng = SimRng::from_seed(2);
        let name = generate_name("Biotech", &mut rng);
        assert!(name.starts_with("Biotech "));
        let suffix = name.strip_prefix("Biotech ").unwrap();
        assert!(NAME_SUFFIXES.contains(&suffix));
    }
}
