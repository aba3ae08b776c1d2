use std::{collections::BTreeSet, str::FromStr};

use log::warn;

use crate::config::Configuration;

/// Which countries a run should process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountrySelection {
    /// Every admin1 country of the selected visualizations.
    All,
    /// The listed ISO3 codes, restricted to the selected visualizations.
    Only(Vec<String>),
}

impl FromStr for CountrySelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CountrySelection::All);
        }
        Ok(CountrySelection::Only(s.split(',')
            .map(|code| code.trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty())
            .collect()))
    }
}

/// Countries to process, sorted, for the given visualizations.
pub fn select_countries(config: &Configuration, visualizations: &[String], selection: &CountrySelection) -> Vec<String> {
    let mut configured: BTreeSet<String> = BTreeSet::new();
    for viz in visualizations {
        match config.adm1.get(viz) {
            Some(codes) => configured.extend(codes.iter().cloned()),
            None => warn!("[pipeline] visualization {viz:?} has no admin1 country list"),
        }
    }

    match selection {
        CountrySelection::All => configured.into_iter().collect(),
        CountrySelection::Only(codes) => {
            let wanted: BTreeSet<String> = codes.iter().cloned().collect();
            for code in wanted.difference(&configured) {
                warn!("[pipeline] {code} is not an admin1 country of the selected visualizations; skipped");
            }
            wanted.intersection(&configured).cloned().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        Configuration::from_yaml_str("adm1:\n  hno: [SDN, AFG]\n  covid: [TCD, AFG]\n").unwrap()
    }

    #[test]
    fn parses_selection() {
        assert_eq!("ALL".parse::<CountrySelection>().unwrap(), CountrySelection::All);
        assert_eq!("afg, sdn,".parse::<CountrySelection>().unwrap(),
            CountrySelection::Only(vec!["AFG".into(), "SDN".into()]));
    }

    #[test]
    fn all_is_the_union_of_visualizations() {
        let vizs = vec!["hno".to_string(), "covid".to_string()];
        assert_eq!(select_countries(&config(), &vizs, &CountrySelection::All), vec!["AFG", "SDN", "TCD"]);
    }

    #[test]
    fn explicit_codes_are_intersected() {
        let vizs = vec!["hno".to_string()];
        let only = CountrySelection::Only(vec!["TCD".into(), "SDN".into()]);
        assert_eq!(select_countries(&config(), &vizs, &only), vec!["SDN"]);
    }
}
