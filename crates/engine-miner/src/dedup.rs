use engine_core::{MinedClaim, MinedJargon, MinedMentalModel, MinedPerson};

/// Case-fold + whitespace-collapse, mirroring `engine_core::episode`'s quote
/// normalization — used here to dedupe items within a segment by normalized
/// text, keeping the first occurrence's timestamp (spec §4.3).
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

pub fn dedup_claims(items: Vec<MinedClaim>) -> Vec<MinedClaim> {
    dedup_by(items, |c| normalize(&c.claim_text))
}

pub fn dedup_jargon(items: Vec<MinedJargon>) -> Vec<MinedJargon> {
    dedup_by(items, |j| normalize(&j.term))
}

pub fn dedup_people(items: Vec<MinedPerson>) -> Vec<MinedPerson> {
    dedup_by(items, |p| normalize(&p.name))
}

pub fn dedup_mental_models(items: Vec<MinedMentalModel>) -> Vec<MinedMentalModel> {
    dedup_by(items, |m| normalize(&m.name))
}

fn dedup_by<T>(items: Vec<T>, key: impl Fn(&T) -> String) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence_case_and_space_insensitively() {
        let claims = vec![
            MinedClaim {
                claim_text: "Rates  Will Rise".into(),
                claim_type: Default::default(),
                stance: Default::default(),
                context_quote: "q1".into(),
                timestamp: 1.0,
                evidence_spans: vec![],
            },
            MinedClaim {
                claim_text: "rates will rise".into(),
                claim_type: Default::default(),
                stance: Default::default(),
                context_quote: "q2".into(),
                timestamp: 99.0,
                evidence_spans: vec![],
            },
        ];
        let deduped = dedup_claims(claims);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].timestamp, 1.0);
    }
}
