use anyhow::{Context, Result};
use engine_core::{ClaimId, ClaimQuestionMapping, Question, QuestionId};

use crate::store::Store;
use crate::tables;

fn mapping_key(claim_id: ClaimId, question_id: QuestionId) -> String {
    format!("{claim_id}:{question_id}")
}

impl Store {
    pub fn create_question(&self, question: Question) -> Result<()> {
        self.put_json(
            tables::QUESTIONS,
            &question.question_id.to_string(),
            &question,
        )
    }

    pub fn get_question(&self, question_id: QuestionId) -> Result<Option<Question>> {
        self.get_json(tables::QUESTIONS, &question_id.to_string())
    }

    pub fn list_questions(&self) -> Result<Vec<Question>> {
        self.scan_all(tables::QUESTIONS)
    }

    /// Existing, non-deprecated questions whose `domain` is in `domains`.
    /// Callers decide the "no overlap -> fall back to all" policy explicitly
    /// by inspecting whether the result is empty, rather than it happening
    /// silently inside the store.
    pub fn get_questions_by_domain(&self, domains: &[String]) -> Result<Vec<Question>> {
        let all = self.list_questions()?;
        Ok(all
            .into_iter()
            .filter(|q| q.deprecated_into.is_none() && domains.iter().any(|d| d == &q.domain))
            .collect())
    }

    /// `(claim_id, question_id)` is unique once persisted (spec §3). Returns
    /// `false` without writing if the pair already exists.
    pub fn put_mapping(&self, mapping: ClaimQuestionMapping) -> Result<bool> {
        let key = mapping_key(mapping.claim_id, mapping.question_id);
        if self
            .get_json::<ClaimQuestionMapping>(tables::CLAIM_QUESTION_MAPPINGS, &key)?
            .is_some()
        {
            return Ok(false);
        }
        self.put_json(tables::CLAIM_QUESTION_MAPPINGS, &key, &mapping)?;
        Ok(true)
    }

    pub fn list_mappings_for_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimQuestionMapping>> {
        let all: Vec<ClaimQuestionMapping> = self.scan_all(tables::CLAIM_QUESTION_MAPPINGS)?;
        Ok(all.into_iter().filter(|m| m.claim_id == claim_id).collect())
    }

    pub fn list_mappings_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<ClaimQuestionMapping>> {
        let all: Vec<ClaimQuestionMapping> = self.scan_all(tables::CLAIM_QUESTION_MAPPINGS)?;
        Ok(all
            .into_iter()
            .filter(|m| m.question_id == question_id)
            .collect())
    }

    /// Rewrite every mapping pointing at `old_id` to point at `new_id`
    /// instead, then mark `old_id` deprecated (spec §4.8
    /// `merge_existing_into_new`).
    pub fn merge_question(&self, old_id: QuestionId, new_id: QuestionId) -> Result<()> {
        let mappings = self.list_mappings_for_question(old_id)?;
        for mapping in mappings {
            let old_key = mapping_key(mapping.claim_id, old_id);
            let moved = ClaimQuestionMapping {
                question_id: new_id,
                ..mapping
            };
            self.put_mapping(moved)?;
            self.delete_mapping(&old_key)?;
        }

        let mut old_question = self
            .get_question(old_id)?
            .with_context(|| format!("no such question {old_id}"))?;
        old_question.deprecated_into = Some(new_id);
        self.create_question(old_question)
    }

    fn delete_mapping(&self, key: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(tables::CLAIM_QUESTION_MAPPINGS)?;
            table.remove(key)?;
        }
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine_core::{QuestionType, RelationType};

    fn sample_question(domain: &str) -> Question {
        Question {
            question_id: QuestionId::new(),
            question_text: "will rates rise?".into(),
            question_type: QuestionType::Forecasting,
            domain: domain.into(),
            importance_score: 0.8,
            reviewed: false,
            created_at: Utc::now(),
            deprecated_into: None,
        }
    }

    #[test]
    fn mapping_insertion_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let claim_id = ClaimId::new();
        let question_id = QuestionId::new();
        let mapping = ClaimQuestionMapping {
            claim_id,
            question_id,
            relation_type: RelationType::Answers,
            relevance_score: 0.9,
        };
        assert!(store.put_mapping(mapping.clone()).unwrap());
        assert!(!store.put_mapping(mapping).unwrap());
        assert_eq!(store.list_mappings_for_claim(claim_id).unwrap().len(), 1);
    }

    #[test]
    fn merge_rewrites_mappings_and_deprecates_old() {
        let store = Store::open_in_memory().unwrap();
        let old_q = sample_question("economics");
        let new_q = sample_question("economics");
        store.create_question(old_q.clone()).unwrap();
        store.create_question(new_q.clone()).unwrap();

        let claim_id = ClaimId::new();
        store
            .put_mapping(ClaimQuestionMapping {
                claim_id,
                question_id: old_q.question_id,
                relation_type: RelationType::Answers,
                relevance_score: 0.7,
            })
            .unwrap();

        store.merge_question(old_q.question_id, new_q.question_id).unwrap();

        let mappings = store.list_mappings_for_claim(claim_id).unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].question_id, new_q.question_id);

        let old_after = store.get_question(old_q.question_id).unwrap().unwrap();
        assert_eq!(old_after.deprecated_into, Some(new_q.question_id));
    }

    #[test]
    fn domain_filter_excludes_deprecated_questions() {
        let store = Store::open_in_memory().unwrap();
        let mut q = sample_question("economics");
        q.deprecated_into = Some(QuestionId::new());
        store.create_question(q).unwrap();
        assert!(
            store
                .get_questions_by_domain(&["economics".to_string()])
                .unwrap()
                .is_empty()
        );
    }
}
